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

//! Component and Bundle traits.
//!
//! Components are data attached to entities, stored column-wise inside the
//! owning archetype. Bundles group several components for `Registry::spawn`.

use crate::entity::EntityId;
use crate::error::Result;
use crate::registry::Registry;

/// Marker trait for component types.
///
/// Components must be `Copy`. Archetype migration relocates component bytes
/// with a raw memcpy and frees the source row immediately afterward
/// (`TypeErasedColumn::copy_to` followed by `swap_remove`); a type with a
/// real destructor could be double-dropped by that sequence. Requiring
/// `Copy` rules that out at compile time rather than by convention.
pub trait Component: Copy + 'static {
    /// Optional teardown hook, invoked on a component value when its row is
    /// removed from storage. Default is a no-op.
    fn teardown(&mut self) {}
}

/// Canonical, stable name for a component type, used as its archetype-hash
/// contribution and for diagnostics.
pub fn component_name<T: 'static>() -> &'static str {
    std::any::type_name::<T>()
}

/// FNV-1a hash of a component's canonical name.
pub fn component_name_hash(name: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash contribution of component type `T` to its owning archetype's hash.
/// `Archetype::hash` is the XOR-fold of this over a component-type set: XOR
/// makes the fold commutative, so insertion order never affects the result.
pub fn component_hash<T: 'static>() -> u64 {
    component_name_hash(component_name::<T>())
}

/// A group of components spawned onto an entity together.
///
/// `Registry::spawn` is sugar over `create_entity` followed by
/// `add_component` for each member, in declared left-to-right order --
/// never a shortcut that jumps directly to the final archetype. This keeps
/// the `add_component` migration protocol as the single source of truth for
/// archetype placement.
pub trait Bundle: 'static {
    fn spawn_into(self, registry: &mut Registry, entity: EntityId) -> Result<()>;
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: Component),+> Bundle for ($($T,)+) {
            #[allow(non_snake_case)]
            fn spawn_into(self, registry: &mut Registry, entity: EntityId) -> Result<()> {
                let ($($T,)+) = self;
                $(registry.add_component(entity, $T)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
