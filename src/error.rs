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

//! Error types.

use std::fmt;

/// Errors raised by registry, query and pipeline operations.
#[derive(Debug, Clone)]
pub enum EcsError {
    /// Entity lookup miss.
    NoSuchEntity,

    /// A runtime invariant was violated (e.g. a swapped-entity ID had no
    /// recorded location, or `swap_remove` returned an unexpected entity).
    /// The source archetype/entity map should be considered corrupted.
    InternalInconsistency(&'static str),

    /// A query's component-type list did not conform to "tuple of distinct types".
    InvalidQuery(&'static str),

    /// A resource operation was issued before `register_resource`.
    UnregisteredResource,

    /// `register_resource` was called twice for the same type.
    ResourceAlreadyRegistered,

    /// A resource operation addressed a collection index that doesn't exist.
    ResourceIndexOutOfBounds,

    /// `add_stage`/`add_stage_after`/`add_stage_before` used a name already
    /// present at this nesting level.
    DuplicateStage(String),

    /// `add_stage_after`/`add_stage_before`/`remove_stage` referenced a
    /// stage name that doesn't exist.
    StageNotFound(String),

    /// An entity already carries a component of the type being added.
    /// Adding it again would XOR the archetype hash back to its prior
    /// value rather than actually changing the component set.
    DuplicateComponent,

    /// A component lookup/removal addressed a type the entity doesn't carry.
    ComponentNotFound,

    /// The 32-bit entity ID space has been exhausted.
    IdSpaceExhausted,

    /// An allocation failed; the operation was rolled back to its
    /// pre-call state.
    OutOfMemory,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::NoSuchEntity => write!(f, "no such entity"),
            EcsError::InternalInconsistency(ctx) => {
                write!(f, "internal inconsistency: {ctx}")
            }
            EcsError::InvalidQuery(ctx) => write!(f, "invalid query: {ctx}"),
            EcsError::UnregisteredResource => write!(f, "resource type not registered"),
            EcsError::ResourceAlreadyRegistered => write!(f, "resource type already registered"),
            EcsError::ResourceIndexOutOfBounds => write!(f, "resource collection index out of bounds"),
            EcsError::DuplicateStage(name) => write!(f, "duplicate stage: {name}"),
            EcsError::StageNotFound(name) => write!(f, "stage not found: {name}"),
            EcsError::DuplicateComponent => {
                write!(f, "entity already has a component of this type")
            }
            EcsError::ComponentNotFound => write!(f, "entity has no component of this type"),
            EcsError::IdSpaceExhausted => write!(f, "entity ID space exhausted"),
            EcsError::OutOfMemory => write!(f, "allocation failed"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias for registry/query/pipeline operations.
pub type Result<T> = std::result::Result<T, EcsError>;

/// Opaque error produced by a system's `process` method.
///
/// Kept distinct from [`EcsError`]: systems are user code and their errors
/// are logged and gated by [`crate::pipeline::StageConfig::continue_on_error`],
/// never propagated as an `EcsError` out of `Pipeline::execute`.
pub type SystemError = Box<dyn std::error::Error + Send + Sync + 'static>;
