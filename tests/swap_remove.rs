//! Destroying a middle entity swaps the last row into the vacated slot and
//! repatches the swapped entity's recorded row index (§8 scenario 3).

use weave_ecs::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct A;
impl Component for A {}

#[test]
fn destroying_a_middle_entity_patches_the_swapped_survivor() {
    let mut registry = Registry::new(RegistryConfig::default());
    let e1 = registry.spawn((A,)).unwrap();
    let e2 = registry.spawn((A,)).unwrap();
    let e3 = registry.spawn((A,)).unwrap();

    registry.destroy_entity(e2).unwrap();

    let query = registry.query::<(A,)>().unwrap();
    let mut survivors: Vec<EntityId> = query.iter().map(EntityView::entity).collect();
    survivors.sort();
    let mut expected = vec![e1, e3];
    expected.sort();
    assert_eq!(survivors, expected);
    assert_eq!(query.len(), 2);
}
