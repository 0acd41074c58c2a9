//! Buffered queries record writes into the update queue instead of mutating
//! the live cell; the last enqueued write for a given `(entity,
//! component-type)` wins once the queue is applied (§8 scenario 4).

use weave_ecs::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pos {
    x: i32,
}
impl Component for Pos {}

#[test]
fn buffered_writes_apply_last_writer_wins() {
    let mut registry = Registry::new(RegistryConfig::default());
    let e = registry.spawn((Pos { x: 0 },)).unwrap();

    {
        let query = registry.query_buffered::<(Pos,)>().unwrap();
        let view = query.iter().next().unwrap();
        assert_eq!(view.read::<Pos>().x, 0);
        view.write(Pos { x: 5 });
        view.write(Pos { x: 7 });
        // The live cell is untouched until apply runs.
        assert_eq!(view.read::<Pos>().x, 0);
    }

    assert!(registry.has_pending_updates());
    registry.apply_buffered_updates();
    assert!(!registry.has_pending_updates());

    let query = registry.query::<(Pos,)>().unwrap();
    let view = query.iter().find(|v| v.entity() == e).unwrap();
    assert_eq!(view.get::<Pos>().x, 7);
}

#[test]
fn discarding_buffered_updates_leaves_the_live_cell_untouched() {
    let mut registry = Registry::new(RegistryConfig::default());
    registry.spawn((Pos { x: 1 },)).unwrap();

    {
        let query = registry.query_buffered::<(Pos,)>().unwrap();
        query.iter().next().unwrap().write(Pos { x: 99 });
    }
    registry.discard_buffered_updates();
    assert!(!registry.has_pending_updates());

    let query = registry.query::<(Pos,)>().unwrap();
    assert_eq!(query.iter().next().unwrap().get::<Pos>().x, 1);
}
