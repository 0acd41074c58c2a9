//! `continue_on_error` governs whether a stage keeps running its remaining
//! systems after one of them errors (§8 scenario 6).

use std::cell::RefCell;
use std::rc::Rc;

use weave_ecs::prelude::*;

struct AlwaysErrors;
impl System for AlwaysErrors {
    fn process(&mut self, _registry: &mut Registry) -> Result<(), SystemError> {
        Err("always fails".into())
    }
}

struct CountInvocations(Rc<RefCell<u32>>);
impl System for CountInvocations {
    fn process(&mut self, _registry: &mut Registry) -> Result<(), SystemError> {
        *self.0.borrow_mut() += 1;
        Ok(())
    }
}

fn build_pipeline(continue_on_error: bool, calls: Rc<RefCell<u32>>) -> Pipeline {
    let mut pipeline = Pipeline::new();
    pipeline
        .add_stage(
            "update",
            StageConfig {
                continue_on_error,
                ..StageConfig::default()
            },
        )
        .unwrap();
    pipeline.add_system("update", AlwaysErrors).unwrap();
    pipeline
        .add_system("update", CountInvocations(calls))
        .unwrap();
    pipeline
}

#[test]
fn sibling_system_is_skipped_when_continue_on_error_is_false() {
    let calls = Rc::new(RefCell::new(0));
    let mut pipeline = build_pipeline(false, calls.clone());
    let mut registry = Registry::new(RegistryConfig::default());
    pipeline.execute(&mut registry);
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn sibling_system_still_runs_when_continue_on_error_is_true() {
    let calls = Rc::new(RefCell::new(0));
    let mut pipeline = build_pipeline(true, calls.clone());
    let mut registry = Registry::new(RegistryConfig::default());
    pipeline.execute(&mut registry);
    assert_eq!(*calls.borrow(), 1);
}
