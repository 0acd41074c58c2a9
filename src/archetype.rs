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

//! Type-erased component columns and the archetype table built from them.

use rustc_hash::FxHashMap;
use std::any::TypeId;

use crate::component::{component_name, Component};
use crate::entity::EntityId;

/// A densely packed, type-erased column of one component type's values.
///
/// Storage is a raw byte buffer rather than `Vec<T>` so that an [`Archetype`]
/// can hold columns of arbitrarily many distinct component types behind a
/// single, uniform handle. The handle carries the per-type operations it
/// needs (teardown, clone-empty) as plain function pointers captured once,
/// at construction, from the statically-known `T` -- a small, one-off
/// vtable rather than a `dyn Trait` object. [`Component`] requires `Copy`,
/// which is what makes the byte-level `copy_to` relocation used during
/// archetype migration sound: a `Copy` type has no destructor, so duplicating
/// its bytes into a new column and freeing the old row can never double-run
/// a destructor or leave dangling owned state.
pub struct TypeErasedColumn {
    data: Vec<u8>,
    item_size: usize,
    type_id: TypeId,
    type_name: &'static str,
    teardown_fn: unsafe fn(*mut u8),
    clone_empty_fn: fn() -> TypeErasedColumn,
}

impl TypeErasedColumn {
    /// Build a fresh, empty column for component type `T`.
    pub fn new<T: Component>() -> Self {
        Self {
            data: Vec::new(),
            item_size: std::mem::size_of::<T>(),
            type_id: TypeId::of::<T>(),
            type_name: component_name::<T>(),
            teardown_fn: |ptr| unsafe { (&mut *(ptr as *mut T)).teardown() },
            clone_empty_fn: || TypeErasedColumn::new::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn len(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn offset(&self, row: usize) -> usize {
        row * self.item_size
    }

    /// Write `value` at `row`, extending the column with zeroed slots if
    /// `row` lands past the current length (§4.1: "extend with uninitialized
    /// slots up to and including `row`"). Callers only ever read rows they
    /// have previously written via `set` or migration, so the zero-fill is
    /// never observed as a real value.
    pub fn set<T: Component>(&mut self, row: usize, value: T) {
        debug_assert_eq!(TypeId::of::<T>(), self.type_id, "component type mismatch");
        let end = self.offset(row) + self.item_size;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        let ptr = unsafe { self.data.as_mut_ptr().add(self.offset(row)) } as *mut T;
        unsafe { std::ptr::write(ptr, value) };
    }

    /// Read the value stored at `row`. Precondition: `row < len()`.
    pub fn get<T: Component>(&self, row: usize) -> Option<&T> {
        debug_assert_eq!(TypeId::of::<T>(), self.type_id, "component type mismatch");
        if row >= self.len() {
            return None;
        }
        let ptr = unsafe { self.data.as_ptr().add(self.offset(row)) } as *const T;
        Some(unsafe { &*ptr })
    }

    pub fn get_mut<T: Component>(&mut self, row: usize) -> Option<&mut T> {
        debug_assert_eq!(TypeId::of::<T>(), self.type_id, "component type mismatch");
        if row >= self.len() {
            return None;
        }
        let ptr = unsafe { self.data.as_mut_ptr().add(self.offset(row)) } as *mut T;
        Some(unsafe { &mut *ptr })
    }

    /// Raw pointer to the row's storage, for use by the query machinery and
    /// the buffered-update applicator. Undefined behavior if the caller
    /// reinterprets it as any type other than this column's element type.
    pub fn row_ptr(&self, row: usize) -> *const u8 {
        unsafe { self.data.as_ptr().add(self.offset(row)) }
    }

    pub fn row_ptr_mut(&mut self, row: usize) -> *mut u8 {
        unsafe { self.data.as_mut_ptr().add(self.offset(row)) }
    }

    /// Remove `row` by swapping in the last row and popping (§4.1). Invokes
    /// the element's teardown hook, if any, on the removed value first.
    pub fn swap_remove(&mut self, row: usize) {
        let last = self.len() - 1;
        unsafe {
            let row_ptr = self.data.as_mut_ptr().add(self.offset(row));
            (self.teardown_fn)(row_ptr);
            if row != last {
                let last_ptr = self.data.as_ptr().add(self.offset(last));
                std::ptr::copy_nonoverlapping(last_ptr, row_ptr, self.item_size);
            }
        }
        let new_len = last * self.item_size;
        self.data.truncate(new_len);
    }

    /// Copy the value at `src_row` into `dst_row` of `dst`, a column of the
    /// same element type. Used during archetype migration; see §4.1/§4.3.2.
    /// The source row is left bit-for-bit intact -- migration frees it
    /// immediately afterward with [`TypeErasedColumn::swap_remove`].
    pub fn copy_to(&self, src_row: usize, dst: &mut TypeErasedColumn, dst_row: usize) {
        debug_assert_eq!(self.type_id, dst.type_id, "copy_to between mismatched columns");
        let end = dst.offset(dst_row) + dst.item_size;
        if end > dst.data.len() {
            dst.data.resize(end, 0);
        }
        unsafe {
            let src_ptr = self.data.as_ptr().add(self.offset(src_row));
            let dst_ptr = dst.data.as_mut_ptr().add(dst.offset(dst_row));
            std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, self.item_size);
        }
    }

    /// Allocate a fresh, empty column for the same element type.
    pub fn clone_empty(&self) -> TypeErasedColumn {
        (self.clone_empty_fn)()
    }
}

/// Row-oriented tuple-of-columns for one archetype.
///
/// All columns, plus `entity_ids`, are kept the same length by construction:
/// every public mutator that changes row count touches every column.
pub struct Archetype {
    hash: u64,
    entity_ids: Vec<EntityId>,
    columns: FxHashMap<TypeId, TypeErasedColumn>,
}

impl Archetype {
    pub fn new(hash: u64) -> Self {
        Self {
            hash,
            entity_ids: Vec::new(),
            columns: FxHashMap::default(),
        }
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }

    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    pub fn has_column(&self, type_id: TypeId) -> bool {
        self.columns.contains_key(&type_id)
    }

    pub fn column_type_ids(&self) -> impl Iterator<Item = &TypeId> {
        self.columns.keys()
    }

    pub fn column(&self, type_id: TypeId) -> Option<&TypeErasedColumn> {
        self.columns.get(&type_id)
    }

    pub fn column_mut(&mut self, type_id: TypeId) -> Option<&mut TypeErasedColumn> {
        self.columns.get_mut(&type_id)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&TypeId, &TypeErasedColumn)> {
        self.columns.iter()
    }

    /// Insert a ready-made (empty) column, used when building a target
    /// archetype during migration by cloning every source column.
    pub fn add_column(&mut self, type_id: TypeId, column: TypeErasedColumn) {
        self.columns.insert(type_id, column);
    }

    /// Append `entity` as a new row. The caller must write every column at
    /// the returned row before the row is observed by a query.
    pub fn push(&mut self, entity: EntityId) -> usize {
        self.entity_ids.push(entity);
        self.entity_ids.len() - 1
    }

    /// Remove `row` by swapping in the last entity/row and popping.
    ///
    /// Returns `(removed_entity, swapped_entity)`: `swapped_entity` is
    /// `Some` iff `row` was not the last row, naming the entity whose row
    /// index changed and must be repatched by the caller.
    pub fn swap_remove(&mut self, row: usize) -> (EntityId, Option<EntityId>) {
        let last = self.entity_ids.len() - 1;
        let removed = self.entity_ids.swap_remove(row);
        for column in self.columns.values_mut() {
            column.swap_remove(row);
        }
        let swapped = if row != last {
            Some(self.entity_ids[row])
        } else {
            None
        };
        (removed, swapped)
    }
}
