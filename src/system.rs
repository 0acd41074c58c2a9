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

//! The `System` trait and its type-erased handle, as stored in a
//! [`crate::pipeline::Stage`]'s system list.

use crate::error::SystemError;
use crate::registry::Registry;

/// A unit of per-frame logic run by a stage.
///
/// There is no `init(allocator)` hook in the trait itself: a `System` value
/// is ordinary owned Rust data, already fully constructed by the caller
/// before it is handed to `Stage::add_system`/`Pipeline::add_system`.
/// `teardown` defaults to a no-op; only `process` is mandatory.
pub trait System: 'static {
    fn process(&mut self, registry: &mut Registry) -> Result<(), SystemError>;

    fn teardown(&mut self) {}
}

/// Fat handle erasing a concrete `System` behind `{drop, teardown, process}`
/// function pointers captured at construction, when the concrete type is
/// still known. Mirrors the type-erasure technique used for component
/// columns in `archetype.rs`, applied to behavior instead of data.
pub(crate) struct SystemHandle {
    name: &'static str,
    instance: *mut (),
    process_fn: unsafe fn(*mut (), &mut Registry) -> Result<(), SystemError>,
    teardown_fn: unsafe fn(*mut ()),
    drop_fn: unsafe fn(*mut ()),
}

impl SystemHandle {
    pub(crate) fn new<S: System>(system: S) -> Self {
        let instance = Box::into_raw(Box::new(system)) as *mut ();
        Self {
            name: std::any::type_name::<S>(),
            instance,
            process_fn: |ptr, registry| unsafe { (*(ptr as *mut S)).process(registry) },
            teardown_fn: |ptr| unsafe { (*(ptr as *mut S)).teardown() },
            drop_fn: |ptr| unsafe { drop(Box::from_raw(ptr as *mut S)) },
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn process(&mut self, registry: &mut Registry) -> Result<(), SystemError> {
        unsafe { (self.process_fn)(self.instance, registry) }
    }

    pub(crate) fn teardown(&mut self) {
        unsafe { (self.teardown_fn)(self.instance) }
    }
}

impl Drop for SystemHandle {
    fn drop(&mut self) {
        unsafe { (self.drop_fn)(self.instance) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        calls: u32,
        torn_down: bool,
    }

    impl System for Counter {
        fn process(&mut self, _registry: &mut Registry) -> Result<(), SystemError> {
            self.calls += 1;
            Ok(())
        }

        fn teardown(&mut self) {
            self.torn_down = true;
        }
    }

    #[test]
    fn handle_dispatches_process_through_erasure() {
        let mut registry = Registry::new(crate::registry::RegistryConfig::default());
        let mut handle = SystemHandle::new(Counter {
            calls: 0,
            torn_down: false,
        });
        handle.process(&mut registry).unwrap();
        handle.process(&mut registry).unwrap();
        handle.teardown();
    }
}
