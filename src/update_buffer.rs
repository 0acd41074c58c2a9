// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! FIFO queue of deferred component writes, recorded by a buffered query
//! and applied later by the registry.

use crate::component::{component_name, Component};
use crate::entity::EntityId;

/// One deferred write: a raw pointer to the still-live component cell, an
/// owned byte buffer holding the new value, and the applicator that
/// memcpys the bytes into the cell. Stored as a function pointer plus a
/// type name rather than `&dyn Any`, so applying a record never needs to
/// downcast -- the pointer and the byte length already agree by
/// construction.
struct UpdateRecord {
    entity: EntityId,
    type_name: &'static str,
    target: *mut u8,
    bytes: Vec<u8>,
    apply: unsafe fn(*mut u8, &[u8]),
}

// SAFETY: `target` is only ever dereferenced by `UpdateBuffer::apply`, which
// runs on the same thread that enqueued the record, before any archetype
// mutation that could invalidate it -- never sent across threads in this
// single-threaded engine.
unsafe impl Send for UpdateRecord {}

/// Holds every pending deferred write until the next apply or discard.
#[derive(Default)]
pub struct UpdateBuffer {
    records: Vec<UpdateRecord>,
}

impl UpdateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Record a deferred write of `value` into `*target`. `target` must
    /// point at a live `T` cell that remains at this address until
    /// `apply` runs -- true as long as no structural mutation occurs
    /// between enqueue and apply, the same discipline queries rely on.
    pub fn enqueue<T: Component>(&mut self, entity: EntityId, target: *mut T, value: T) {
        let mut bytes = vec![0u8; std::mem::size_of::<T>()];
        unsafe {
            std::ptr::copy_nonoverlapping(
                &value as *const T as *const u8,
                bytes.as_mut_ptr(),
                bytes.len(),
            );
        }
        std::mem::forget(value);
        self.records.push(UpdateRecord {
            entity,
            type_name: component_name::<T>(),
            target: target as *mut u8,
            bytes,
            apply: |target, bytes| unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), target, bytes.len());
            },
        });
    }

    /// Drain the queue in FIFO order, memcpying each record's bytes into
    /// its live cell. If several records target the same `(entity,
    /// component-type)`, the last one enqueued runs last and therefore
    /// wins -- no coalescing or reordering.
    pub fn apply(&mut self) {
        for record in self.records.drain(..) {
            unsafe { (record.apply)(record.target, &record.bytes) };
        }
    }

    /// Drop every pending record without applying it.
    pub fn discard(&mut self) {
        self.records.clear();
    }

    /// Pending `(entity, component type name)` pairs, in FIFO order, for
    /// diagnostics.
    pub fn pending(&self) -> impl Iterator<Item = (EntityId, &'static str)> + '_ {
        self.records.iter().map(|r| (r.entity, r.type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: f32,
    }
    impl Component for Pos {}

    #[test]
    fn apply_is_noop_on_empty_buffer() {
        let mut buffer = UpdateBuffer::new();
        buffer.apply();
        assert!(buffer.is_empty());
    }

    #[test]
    fn last_writer_wins_for_same_cell() {
        let mut cell = Pos { x: 0.0 };
        let mut buffer = UpdateBuffer::new();
        let entity = EntityId(0);
        buffer.enqueue(entity, &mut cell as *mut Pos, Pos { x: 5.0 });
        buffer.enqueue(entity, &mut cell as *mut Pos, Pos { x: 7.0 });
        assert_eq!(buffer.len(), 2);
        buffer.apply();
        assert_eq!(cell, Pos { x: 7.0 });
        assert!(buffer.is_empty());
    }

    #[test]
    fn discard_drops_without_applying() {
        let mut cell = Pos { x: 0.0 };
        let mut buffer = UpdateBuffer::new();
        buffer.enqueue(EntityId(0), &mut cell as *mut Pos, Pos { x: 9.0 });
        buffer.discard();
        assert!(buffer.is_empty());
        assert_eq!(cell, Pos { x: 0.0 });
    }
}
