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

//! Registry: the owning container for entities, archetypes, resources,
//! the pipeline and the buffered-update queue.

use std::any::TypeId;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::archetype::{Archetype, TypeErasedColumn};
use crate::component::{component_hash, component_name, Bundle, Component};
use crate::entity::{EntityId, EntityLocation};
use crate::error::{EcsError, Result};
use crate::pipeline::Pipeline;
use crate::plugin::Plugin;
use crate::query::{BufferedQuery, Query, QueryTypes};
use crate::resources::{Resource, ResourceKind, ResourceStore, ResourceView};
use crate::update_buffer::UpdateBuffer;

/// Registry-wide configuration, set once at construction.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// When true, a non-void archetype whose row count drops to zero as a
    /// side effect of `add_component`/`destroy_entity` is removed from the
    /// archetype map immediately.
    pub destroy_empty_archetypes: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            destroy_empty_archetypes: true,
        }
    }
}

/// The owning container: entity↔location map, archetype map, resources,
/// plugins, pipeline and buffered-update queue.
pub struct Registry {
    config: RegistryConfig,
    next_entity_id: u32,
    entities: FxHashMap<EntityId, EntityLocation>,
    archetypes: FxHashMap<u64, Archetype>,
    resources: ResourceStore,
    update_buffer: UpdateBuffer,
    plugins: Vec<Plugin>,
    pipeline: Pipeline,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        let mut archetypes = FxHashMap::default();
        archetypes.insert(0, Archetype::new(0));
        Self {
            config,
            next_entity_id: 0,
            entities: FxHashMap::default(),
            archetypes,
            resources: ResourceStore::new(),
            update_buffer: UpdateBuffer::new(),
            plugins: Vec::new(),
            pipeline: Pipeline::new(),
        }
    }

    // ---- entity lifecycle (§4.3.1) ----------------------------------

    pub fn create_entity(&mut self) -> Result<EntityId> {
        if self.next_entity_id == u32::MAX {
            return Err(EcsError::IdSpaceExhausted);
        }
        let entity = EntityId(self.next_entity_id);
        let void = self
            .archetypes
            .get_mut(&0)
            .expect("void archetype always exists");
        let row = void.push(entity);
        self.next_entity_id += 1;
        self.entities.insert(
            entity,
            EntityLocation {
                archetype_hash: 0,
                row,
            },
        );
        tracing::trace!(%entity, "create_entity");
        Ok(entity)
    }

    /// `create_entity` followed by `add_component` for each bundle member,
    /// in declared order. On failure the created entity is destroyed
    /// before the error propagates.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Result<EntityId> {
        let entity = self.create_entity()?;
        match bundle.spawn_into(self, entity) {
            Ok(()) => Ok(entity),
            Err(err) => {
                let _ = self.destroy_entity(entity);
                Err(err)
            }
        }
    }

    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<()> {
        let loc = *self.entities.get(&entity).ok_or(EcsError::NoSuchEntity)?;
        let archetype = self
            .archetypes
            .get_mut(&loc.archetype_hash)
            .ok_or(EcsError::InternalInconsistency("entity points at missing archetype"))?;
        let (removed, swapped) = archetype.swap_remove(loc.row);
        debug_assert_eq!(removed, entity);
        let became_empty = archetype.is_empty();

        if let Some(swapped_entity) = swapped {
            let swapped_loc = self
                .entities
                .get_mut(&swapped_entity)
                .ok_or(EcsError::InternalInconsistency("swapped entity has no location"))?;
            swapped_loc.row = loc.row;
        }
        self.entities.remove(&entity);

        if self.config.destroy_empty_archetypes && loc.archetype_hash != 0 && became_empty {
            self.archetypes.remove(&loc.archetype_hash);
        }
        tracing::trace!(%entity, "destroy_entity");
        Ok(())
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> Result<bool> {
        let loc = self.entities.get(&entity).ok_or(EcsError::NoSuchEntity)?;
        let archetype = self
            .archetypes
            .get(&loc.archetype_hash)
            .ok_or(EcsError::InternalInconsistency("entity points at missing archetype"))?;
        Ok(archetype.has_column(TypeId::of::<T>()))
    }

    // ---- archetype migration (§4.3.2) --------------------------------

    /// The engine's central algorithm: move `entity` into the archetype
    /// reached by adding component `T`, following the nine numbered steps
    /// of the migration protocol.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> Result<()> {
        let loc = *self.entities.get(&entity).ok_or(EcsError::NoSuchEntity)?;
        let source_hash = loc.archetype_hash;
        let row = loc.row;

        // Step 1.
        let contribution = component_hash::<T>();
        let target_hash = source_hash ^ contribution;
        if target_hash == source_hash {
            // h(n) ^ h(n) == 0: the entity already carries a column for T.
            return Err(EcsError::DuplicateComponent);
        }

        tracing::trace!(
            %entity,
            source_hash,
            target_hash,
            component = component_name::<T>(),
            "add_component"
        );

        // Step 2: get_or_create the target archetype B.
        if !self.archetypes.contains_key(&target_hash) {
            let mut new_archetype = Archetype::new(target_hash);
            {
                let source = self
                    .archetypes
                    .get(&source_hash)
                    .ok_or(EcsError::InternalInconsistency("source archetype missing"))?;
                for (type_id, column) in source.columns() {
                    new_archetype.add_column(*type_id, column.clone_empty());
                }
            }
            new_archetype.add_column(TypeId::of::<T>(), TypeErasedColumn::new::<T>());
            self.archetypes.insert(target_hash, new_archetype);
        }

        // Step 3: re-obtain A. The insert above may have grown the
        // archetype map, invalidating any reference to A taken before it --
        // this is why A is pulled out by value rather than borrowed again.
        // Holding it locally also means every later step in this function
        // sees only one live borrow of `self.archetypes` at a time.
        let mut source_archetype = self
            .archetypes
            .remove(&source_hash)
            .ok_or(EcsError::InternalInconsistency("source archetype vanished"))?;

        let migration = (|| -> Result<usize> {
            let target = self
                .archetypes
                .get_mut(&target_hash)
                .ok_or(EcsError::InternalInconsistency("target archetype vanished"))?;

            // Step 4.
            let j = target.push(entity);

            // Step 5: copy every column A and B share.
            let shared_type_ids: SmallVec<[TypeId; 16]> =
                source_archetype.column_type_ids().copied().collect();
            for type_id in shared_type_ids {
                let src_column = source_archetype
                    .column(type_id)
                    .expect("type id was just listed from this archetype's own columns");
                let dst_column = target
                    .column_mut(type_id)
                    .expect("B clones every column of A in step 2");
                src_column.copy_to(row, dst_column, j);
            }

            // Step 6.
            target
                .column_mut(TypeId::of::<T>())
                .expect("B always carries a column for the component being added")
                .set(j, value);

            Ok(j)
        })();

        let j = match migration {
            Ok(j) => j,
            Err(err) => {
                // Rollback: undo the B append, if it happened, and restore A.
                if let Some(target) = self.archetypes.get_mut(&target_hash) {
                    if target.entity_ids().last() == Some(&entity) {
                        target.swap_remove(target.len() - 1);
                    }
                }
                self.archetypes.insert(source_hash, source_archetype);
                return Err(err);
            }
        };

        // Step 7.
        self.entities.insert(
            entity,
            EntityLocation {
                archetype_hash: target_hash,
                row: j,
            },
        );

        // Step 8.
        let (removed, swapped) = source_archetype.swap_remove(row);
        debug_assert_eq!(removed, entity, "swap_remove on A returned the wrong entity");
        if let Some(swapped_entity) = swapped {
            let swapped_loc = self
                .entities
                .get_mut(&swapped_entity)
                .ok_or(EcsError::InternalInconsistency("swapped entity has no location"))?;
            swapped_loc.row = row;
        }

        // Step 9.
        if self.config.destroy_empty_archetypes && source_hash != 0 && source_archetype.is_empty() {
            // Dropped rather than reinserted.
        } else {
            self.archetypes.insert(source_hash, source_archetype);
        }

        Ok(())
    }

    // ---- queries (§4.3.4, §4.3.5) -------------------------------------

    pub fn query<Q: QueryTypes>(&self) -> Result<Query> {
        Query::build::<Q>(self.archetypes.values())
    }

    pub fn query_buffered<Q: QueryTypes>(&mut self) -> Result<BufferedQuery> {
        let update_buffer = &mut self.update_buffer as *mut UpdateBuffer;
        BufferedQuery::build::<Q>(self.archetypes.values(), update_buffer)
    }

    pub fn apply_buffered_updates(&mut self) {
        self.update_buffer.apply();
    }

    pub fn discard_buffered_updates(&mut self) {
        self.update_buffer.discard();
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.update_buffer.is_empty()
    }

    // ---- resources (§4.3.6) --------------------------------------------

    pub fn register_resource<T: Resource>(&mut self, kind: ResourceKind) -> Result<()> {
        self.resources.register::<T>(kind)
    }

    pub fn resource_registered<T: Resource>(&self) -> bool {
        self.resources.registered::<T>()
    }

    pub fn query_resource<T: Resource>(&self) -> Result<ResourceView<'_, T>> {
        self.resources.query::<T>()
    }

    pub fn push_resource<T: Resource>(&mut self, value: T) -> Result<()> {
        self.resources.push(value)
    }

    pub fn clear_resource<T: Resource>(&mut self) -> Result<()> {
        self.resources.clear::<T>()
    }

    pub fn remove_resource<T: Resource>(&mut self, index: usize) -> Result<()> {
        self.resources.remove::<T>(index)
    }

    // ---- plugins and pipeline (§4.3.7, §4.4) ---------------------------

    pub fn add_plugin(&mut self, plugin: Plugin) {
        let init = plugin.init;
        self.plugins.push(plugin);
        init(self);
    }

    pub fn set_pipeline(&mut self, pipeline: Pipeline) {
        self.pipeline = pipeline;
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// Runs the pipeline. The pipeline is swapped out for the duration of
    /// the call: `Pipeline::execute` needs `&mut Registry`, and the
    /// pipeline itself lives inside the registry, so it cannot be borrowed
    /// at the same time as `self`.
    pub fn execute_pipeline(&mut self) {
        let mut pipeline = std::mem::take(&mut self.pipeline);
        pipeline.execute(self);
        self.pipeline = pipeline;
    }

    pub fn execute_pipeline_stages(&mut self, names: &[&str]) {
        let mut pipeline = std::mem::take(&mut self.pipeline);
        pipeline.execute_stages(self, names);
        self.pipeline = pipeline;
    }

    pub fn execute_pipeline_stages_if(&mut self, predicate: impl Fn(&str) -> bool) {
        let mut pipeline = std::mem::take(&mut self.pipeline);
        pipeline.execute_stages_if(self, predicate);
        self.pipeline = pipeline;
    }

    // ---- diagnostics (supplemental, read-only) -------------------------

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn archetype_row_count(&self, hash: u64) -> Option<usize> {
        self.archetypes.get(&hash).map(Archetype::len)
    }

    // ---- teardown -------------------------------------------------------

    /// Tears down every plugin, the pipeline's systems, every resource, and
    /// discards any pending buffered updates, in that order.
    pub fn teardown(&mut self) {
        let plugins = std::mem::take(&mut self.plugins);
        for plugin in plugins {
            if let Some(teardown) = plugin.teardown {
                teardown(self);
            }
        }
        self.pipeline.teardown();
        self.resources.teardown_all();
        self.update_buffer.discard();
        self.archetypes.clear();
        self.archetypes.insert(0, Archetype::new(0));
        self.entities.clear();
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.teardown();
    }
}
