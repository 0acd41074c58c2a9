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

//! weave_ecs - an archetype-oriented Entity-Component-System core.
//!
//! A [`Registry`] owns a population of entities, grouping them into
//! [`archetype::Archetype`] tables by exact component-type set, plus
//! registry-scoped [`resources`] and a [`pipeline::Pipeline`] of staged
//! systems. See the module docs for the storage engine (`archetype`,
//! `component`, `registry`) and the scheduler (`pipeline`, `system`).

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod pipeline;
pub mod plugin;
pub mod query;
pub mod registry;
pub mod resources;
pub mod system;
pub mod update_buffer;

pub mod prelude;

pub use archetype::{Archetype, TypeErasedColumn};
pub use component::{component_hash, component_name, Bundle, Component};
pub use entity::{EntityId, EntityLocation};
pub use error::{EcsError, Result, SystemError};
pub use pipeline::{Gate, Pipeline, Stage, StageConfig};
pub use plugin::Plugin;
pub use query::{BufferedEntityView, BufferedQuery, EntityView, Query};
pub use registry::{Registry, RegistryConfig};
pub use resources::{Resource, ResourceKind, ResourceView};
pub use system::System;
pub use update_buffer::UpdateBuffer;
