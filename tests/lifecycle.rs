//! Create an entity, add components, destroy it, then create and populate a
//! second entity: the destroyed entity's ID stays retired and a fresh query
//! only sees the surviving entity (§8).

use weave_ecs::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Name(&'static str);
impl Component for Name {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);
impl Component for Health {}

#[test]
fn create_add_destroy_add() {
    let mut registry = Registry::new(RegistryConfig::default());

    let e = registry.create_entity().unwrap();
    registry.add_component(e, Name("Jane")).unwrap();
    registry.add_component(e, Health(10)).unwrap();
    registry.destroy_entity(e).unwrap();

    let f = registry.create_entity().unwrap();
    registry.add_component(f, Name("Kai")).unwrap();

    assert!(matches!(
        registry.has_component::<Name>(e),
        Err(EcsError::NoSuchEntity)
    ));

    let query = registry.query::<(Name,)>().unwrap();
    let names: Vec<EntityId> = query.iter().map(EntityView::entity).collect();
    assert_eq!(names, vec![f]);
}

#[test]
fn destroy_entity_of_unknown_id_errors() {
    let mut registry = Registry::new(RegistryConfig::default());
    let e = registry.create_entity().unwrap();
    registry.destroy_entity(e).unwrap();
    assert!(matches!(
        registry.destroy_entity(e),
        Err(EcsError::NoSuchEntity)
    ));
}
