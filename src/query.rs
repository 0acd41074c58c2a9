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

//! Component queries: archetype filtering plus the entity-view machinery
//! built on top of it, both immediate and buffered.

use std::any::TypeId;

use smallvec::{smallvec, SmallVec};

use crate::archetype::Archetype;
use crate::component::Component;
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::update_buffer::UpdateBuffer;

/// Upper bound on the arity of a query's component tuple.
pub const MAX_QUERY_COMPONENTS: usize = 8;

/// A tuple of distinct [`Component`] types usable as a query argument.
pub trait QueryTypes: 'static {
    fn type_ids() -> SmallVec<[TypeId; MAX_QUERY_COMPONENTS]>;
}

macro_rules! impl_query_types {
    ($($T:ident),+) => {
        impl<$($T: Component),+> QueryTypes for ($($T,)+) {
            fn type_ids() -> SmallVec<[TypeId; MAX_QUERY_COMPONENTS]> {
                smallvec![$(TypeId::of::<$T>()),+]
            }
        }
    };
}

impl_query_types!(A);
impl_query_types!(A, B);
impl_query_types!(A, B, C);
impl_query_types!(A, B, C, D);
impl_query_types!(A, B, C, D, E);
impl_query_types!(A, B, C, D, E, F);
impl_query_types!(A, B, C, D, E, F, G);
impl_query_types!(A, B, C, D, E, F, G, H);

/// Checks the tuple is non-empty and carries no repeated type.
fn validate(type_ids: &[TypeId]) -> Result<()> {
    if type_ids.is_empty() {
        return Err(EcsError::InvalidQuery(
            "query must name at least one component type",
        ));
    }
    for i in 0..type_ids.len() {
        for j in (i + 1)..type_ids.len() {
            if type_ids[i] == type_ids[j] {
                return Err(EcsError::InvalidQuery(
                    "query component types must be distinct",
                ));
            }
        }
    }
    Ok(())
}

fn archetype_matches(archetype: &Archetype, type_ids: &[TypeId]) -> bool {
    type_ids.iter().all(|t| archetype.has_column(*t))
}

/// A raw pointer into one archetype column, tagged with the type it points
/// at so [`EntityView::get`]/[`EntityView::get_mut`] can recover it by
/// downcast.
#[derive(Clone, Copy)]
struct Fetched {
    type_id: TypeId,
    ptr: *mut u8,
}

fn fetch_row(
    archetype: &Archetype,
    row: usize,
    type_ids: &[TypeId],
) -> SmallVec<[Fetched; MAX_QUERY_COMPONENTS]> {
    type_ids
        .iter()
        .map(|type_id| {
            let column = archetype
                .column(*type_id)
                .expect("archetype matched by superset check must carry every requested column");
            Fetched {
                type_id: *type_id,
                ptr: column.row_ptr(row) as *mut u8,
            }
        })
        .collect()
}

fn find_fetched<T: Component>(fetched: &[Fetched]) -> &Fetched {
    let type_id = TypeId::of::<T>();
    fetched
        .iter()
        .find(|f| f.type_id == type_id)
        .expect("T is not one of this view's queried component types")
}

/// One matched entity's row, as raw pointers into its archetype's columns.
///
/// Snapshotted at query construction time (see [`Query::build`]); the
/// pointers remain valid only until the next structural mutation of the
/// registry (`add_component`, `create_entity`, `destroy_entity`, `spawn`).
/// The engine does not police this -- it is the same aliasing discipline
/// the rest of the storage engine relies on (§5 of the design: callers
/// receive short-lived raw pointers and are trusted not to alias them
/// across a structural mutation).
pub struct EntityView {
    entity: EntityId,
    fetched: SmallVec<[Fetched; MAX_QUERY_COMPONENTS]>,
}

impl EntityView {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn get<T: Component>(&self) -> &T {
        let fetched = find_fetched::<T>(&self.fetched);
        unsafe { &*(fetched.ptr as *const T) }
    }

    /// Mutate in place. Takes `&self`, not `&mut self`: the view only ever
    /// holds raw pointers, so there is nothing for the borrow checker to
    /// track -- aliasing across calls is the caller's responsibility, same
    /// as every other raw-pointer access in this engine.
    pub fn get_mut<T: Component>(&self) -> &mut T {
        let fetched = find_fetched::<T>(&self.fetched);
        unsafe { &mut *(fetched.ptr as *mut T) }
    }
}

/// Result of `Registry::query`: one [`EntityView`] per matched row,
/// snapshotted at construction (§4.3.4).
pub struct Query {
    views: Vec<EntityView>,
}

impl Query {
    pub(crate) fn build<'a, Q: QueryTypes>(
        archetypes: impl Iterator<Item = &'a Archetype>,
    ) -> Result<Self> {
        let type_ids = Q::type_ids();
        validate(&type_ids)?;
        let mut views = Vec::new();
        for archetype in archetypes {
            if !archetype_matches(archetype, &type_ids) {
                continue;
            }
            for row in 0..archetype.len() {
                views.push(EntityView {
                    entity: archetype.entity_ids()[row],
                    fetched: fetch_row(archetype, row, &type_ids),
                });
            }
        }
        Ok(Query { views })
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityView> {
        self.views.iter()
    }
}

impl IntoIterator for Query {
    type Item = EntityView;
    type IntoIter = std::vec::IntoIter<EntityView>;

    fn into_iter(self) -> Self::IntoIter {
        self.views.into_iter()
    }
}

impl<'a> IntoIterator for &'a Query {
    type Item = &'a EntityView;
    type IntoIter = std::slice::Iter<'a, EntityView>;

    fn into_iter(self) -> Self::IntoIter {
        self.views.iter()
    }
}

/// One matched entity's row for a buffered query: reads see the live
/// value, writes are recorded into the registry's [`UpdateBuffer`] instead
/// of mutating in place (§4.3.5).
pub struct BufferedEntityView {
    entity: EntityId,
    fetched: SmallVec<[Fetched; MAX_QUERY_COMPONENTS]>,
    update_buffer: *mut UpdateBuffer,
}

impl BufferedEntityView {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn read<T: Component>(&self) -> &T {
        let fetched = find_fetched::<T>(&self.fetched);
        unsafe { &*(fetched.ptr as *const T) }
    }

    /// Queue `value` to be written into this entity's `T` cell on the next
    /// `apply_buffered_updates`. Does not touch the live cell.
    pub fn write<T: Component>(&self, value: T) {
        let fetched = find_fetched::<T>(&self.fetched);
        let target = fetched.ptr as *mut T;
        unsafe { (&mut *self.update_buffer).enqueue(self.entity, target, value) };
    }
}

/// Result of `Registry::query_buffered`.
pub struct BufferedQuery {
    views: Vec<BufferedEntityView>,
}

impl BufferedQuery {
    pub(crate) fn build<'a, Q: QueryTypes>(
        archetypes: impl Iterator<Item = &'a Archetype>,
        update_buffer: *mut UpdateBuffer,
    ) -> Result<Self> {
        let type_ids = Q::type_ids();
        validate(&type_ids)?;
        let mut views = Vec::new();
        for archetype in archetypes {
            if !archetype_matches(archetype, &type_ids) {
                continue;
            }
            for row in 0..archetype.len() {
                views.push(BufferedEntityView {
                    entity: archetype.entity_ids()[row],
                    fetched: fetch_row(archetype, row, &type_ids),
                    update_buffer,
                });
            }
        }
        Ok(BufferedQuery { views })
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BufferedEntityView> {
        self.views.iter()
    }
}

impl IntoIterator for BufferedQuery {
    type Item = BufferedEntityView;
    type IntoIter = std::vec::IntoIter<BufferedEntityView>;

    fn into_iter(self) -> Self::IntoIter {
        self.views.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: f32,
    }
    impl Component for Pos {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Vel {
        dx: f32,
    }
    impl Component for Vel {}

    fn archetype_with_pos(entities: &[EntityId]) -> Archetype {
        let mut arch = Archetype::new(crate::component::component_hash::<Pos>());
        arch.add_column(
            TypeId::of::<Pos>(),
            crate::archetype::TypeErasedColumn::new::<Pos>(),
        );
        for (i, &e) in entities.iter().enumerate() {
            let row = arch.push(e);
            arch.column_mut(TypeId::of::<Pos>())
                .unwrap()
                .set(row, Pos { x: i as f32 });
        }
        arch
    }

    #[test]
    fn query_matches_superset_and_yields_every_row_once() {
        let entities = [EntityId(0), EntityId(1), EntityId(2)];
        let arch = archetype_with_pos(&entities);
        let query = Query::build::<(Pos,)>(std::iter::once(&arch)).unwrap();
        assert_eq!(query.len(), 3);
        let xs: Vec<f32> = query.iter().map(|v| v.get::<Pos>().x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn query_rejects_type_not_in_any_archetype() {
        let arch = archetype_with_pos(&[EntityId(0)]);
        let result = Query::build::<(Vel,)>(std::iter::once(&arch));
        assert_eq!(result.unwrap().len(), 0);
    }

    #[test]
    fn buffered_write_does_not_mutate_until_applied() {
        let arch = archetype_with_pos(&[EntityId(0)]);
        let mut buffer = UpdateBuffer::new();
        let query =
            BufferedQuery::build::<(Pos,)>(std::iter::once(&arch), &mut buffer as *mut _).unwrap();
        let view = query.iter().next().unwrap();
        assert_eq!(view.read::<Pos>().x, 0.0);
        view.write(Pos { x: 9.0 });
        assert_eq!(view.read::<Pos>().x, 0.0);
        buffer.apply();
        assert_eq!(view.read::<Pos>().x, 9.0);
    }

    #[test]
    fn empty_archetype_map_yields_empty_query() {
        let archetypes: FxHashMap<u64, Archetype> = FxHashMap::default();
        let query = Query::build::<(Pos,)>(archetypes.values()).unwrap();
        assert!(query.is_empty());
    }
}
