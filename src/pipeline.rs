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

//! Pipeline and Stage: ordered, gated, nestable execution of systems.
//!
//! Execution is strictly sequential -- `StageConfig::parallel` is reserved
//! and currently ignored. Parallel stage execution is out of scope for
//! this engine.

use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};
use crate::registry::Registry;
use crate::system::{System, SystemHandle};

/// `AND`/`OR` combination mode for `has_stages`/`stages_empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    And,
    Or,
}

/// Per-stage configuration.
pub struct StageConfig {
    pub enabled: bool,
    pub continue_on_error: bool,
    pub run_condition: Option<Box<dyn Fn(&Registry) -> bool>>,
    /// Reserved for a future parallel executor; ignored by this engine.
    pub parallel: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            continue_on_error: false,
            run_condition: None,
            parallel: false,
        }
    }
}

impl std::fmt::Debug for StageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageConfig")
            .field("enabled", &self.enabled)
            .field("continue_on_error", &self.continue_on_error)
            .field("run_condition", &self.run_condition.is_some())
            .field("parallel", &self.parallel)
            .finish()
    }
}

/// A named, ordered bucket of systems within a [`Pipeline`].
pub struct Stage {
    name: String,
    config: StageConfig,
    systems: Vec<SystemHandle>,
    substages: Option<Pipeline>,
}

impl Stage {
    pub fn new(name: impl Into<String>, config: StageConfig) -> Self {
        Self {
            name: name.into(),
            config,
            systems: Vec::new(),
            substages: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(SystemHandle::name).collect()
    }

    pub fn add_system<S: System>(&mut self, system: S) {
        self.systems.push(SystemHandle::new(system));
    }

    /// Nested pipeline run before this stage's own systems (§4.4.2). Lazily
    /// created on first use; recursive, with no artificial depth limit.
    pub fn substages_mut(&mut self) -> &mut Pipeline {
        self.substages.get_or_insert_with(Pipeline::new)
    }

    pub fn substages(&self) -> Option<&Pipeline> {
        self.substages.as_ref()
    }

    pub fn add_substage(&mut self, name: impl Into<String>, config: StageConfig) -> Result<()> {
        self.substages_mut().add_stage(name, config)
    }

    pub fn remove_substage(&mut self, name: &str) -> Result<()> {
        match &mut self.substages {
            Some(pipeline) => pipeline.remove_stage(name),
            None => Err(EcsError::StageNotFound(name.to_string())),
        }
    }

    fn teardown(&mut self) {
        for system in &mut self.systems {
            system.teardown();
        }
        self.systems.clear();
        if let Some(substages) = &mut self.substages {
            substages.teardown();
        }
    }

    /// Stage execution algorithm (§4.4.2): gate on `enabled` and
    /// `run_condition`, run substages, then run own systems in
    /// registration order, honoring `continue_on_error`.
    fn execute(&mut self, registry: &mut Registry) {
        if !self.config.enabled {
            tracing::trace!(stage = %self.name, "stage disabled, skipping");
            return;
        }
        if let Some(condition) = &self.config.run_condition {
            if !condition(registry) {
                tracing::trace!(stage = %self.name, "run_condition false, skipping");
                return;
            }
        }
        if let Some(substages) = &mut self.substages {
            substages.execute(registry);
        }
        for (index, system) in self.systems.iter_mut().enumerate() {
            if let Err(error) = system.process(registry) {
                tracing::error!(
                    stage = %self.name,
                    system_index = index,
                    system = system.name(),
                    %error,
                    "system returned an error"
                );
                if !self.config.continue_on_error {
                    break;
                }
            }
        }
    }
}

/// A tuple of distinct [`System`] types, usable with `Pipeline::add_systems`.
pub trait SystemTuple: 'static {
    fn add_to(self, stage: &mut Stage);
}

macro_rules! impl_system_tuple {
    ($($T:ident),+) => {
        impl<$($T: System),+> SystemTuple for ($($T,)+) {
            #[allow(non_snake_case)]
            fn add_to(self, stage: &mut Stage) {
                let ($($T,)+) = self;
                $(stage.add_system($T);)+
            }
        }
    };
}

impl_system_tuple!(A);
impl_system_tuple!(A, B);
impl_system_tuple!(A, B, C);
impl_system_tuple!(A, B, C, D);
impl_system_tuple!(A, B, C, D, E);
impl_system_tuple!(A, B, C, D, E, F);
impl_system_tuple!(A, B, C, D, E, F, G);
impl_system_tuple!(A, B, C, D, E, F, G, H);

/// An ordered sequence of named stages; may recurse through substages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    index: FxHashMap<String, usize>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, stage) in self.stages.iter().enumerate() {
            self.index.insert(stage.name().to_string(), i);
        }
    }

    pub fn add_stage(&mut self, name: impl Into<String>, config: StageConfig) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(EcsError::DuplicateStage(name));
        }
        self.index.insert(name.clone(), self.stages.len());
        self.stages.push(Stage::new(name, config));
        Ok(())
    }

    pub fn add_stage_after(
        &mut self,
        name: impl Into<String>,
        after: &str,
        config: StageConfig,
    ) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(EcsError::DuplicateStage(name));
        }
        let after_index = *self
            .index
            .get(after)
            .ok_or_else(|| EcsError::StageNotFound(after.to_string()))?;
        self.stages.insert(after_index + 1, Stage::new(name, config));
        self.rebuild_index();
        Ok(())
    }

    pub fn add_stage_before(
        &mut self,
        name: impl Into<String>,
        before: &str,
        config: StageConfig,
    ) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(EcsError::DuplicateStage(name));
        }
        let before_index = *self
            .index
            .get(before)
            .ok_or_else(|| EcsError::StageNotFound(before.to_string()))?;
        self.stages.insert(before_index, Stage::new(name, config));
        self.rebuild_index();
        Ok(())
    }

    pub fn remove_stage(&mut self, name: &str) -> Result<()> {
        let index = self
            .index
            .get(name)
            .copied()
            .ok_or_else(|| EcsError::StageNotFound(name.to_string()))?;
        let mut removed = self.stages.remove(index);
        removed.teardown();
        self.rebuild_index();
        Ok(())
    }

    pub fn get_stage(&self, name: &str) -> Result<&Stage> {
        let index = *self
            .index
            .get(name)
            .ok_or_else(|| EcsError::StageNotFound(name.to_string()))?;
        Ok(&self.stages[index])
    }

    pub fn get_stage_mut(&mut self, name: &str) -> Result<&mut Stage> {
        let index = *self
            .index
            .get(name)
            .ok_or_else(|| EcsError::StageNotFound(name.to_string()))?;
        Ok(&mut self.stages[index])
    }

    pub fn add_system<S: System>(&mut self, stage: &str, system: S) -> Result<()> {
        self.get_stage_mut(stage)?.add_system(system);
        Ok(())
    }

    pub fn add_systems<T: SystemTuple>(&mut self, stage: &str, systems: T) -> Result<()> {
        systems.add_to(self.get_stage_mut(stage)?);
        Ok(())
    }

    pub fn has_stage(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn has_stages(&self, names: &[&str], gate: Gate) -> bool {
        match gate {
            Gate::And => names.iter().all(|n| self.has_stage(n)),
            Gate::Or => names.iter().any(|n| self.has_stage(n)),
        }
    }

    pub fn get_stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn get_system_names(&self, stage: &str) -> Result<Vec<&str>> {
        Ok(self.get_stage(stage)?.system_names())
    }

    pub fn stage_empty(&self, name: &str) -> Result<bool> {
        Ok(self.get_stage(name)?.is_empty())
    }

    pub fn stages_empty(&self, names: &[&str], gate: Gate) -> Result<bool> {
        let mut empties = Vec::with_capacity(names.len());
        for name in names {
            empties.push(self.stage_empty(name)?);
        }
        Ok(match gate {
            Gate::And => empties.into_iter().all(|b| b),
            Gate::Or => empties.into_iter().any(|b| b),
        })
    }

    pub fn execute(&mut self, registry: &mut Registry) {
        for stage in &mut self.stages {
            stage.execute(registry);
        }
    }

    /// Execute the named stages in pipeline order, regardless of the order
    /// they were requested in. A name with no matching stage is logged and
    /// skipped; a name repeated in `names` causes its stage to execute
    /// once per occurrence, by design.
    pub fn execute_stages(&mut self, registry: &mut Registry, names: &[&str]) {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            match self.index.get(*name) {
                Some(&i) => indices.push(i),
                None => tracing::warn!(stage = *name, "execute_stages: no such stage, skipping"),
            }
        }
        indices.sort_unstable();
        for index in indices {
            self.stages[index].execute(registry);
        }
    }

    pub fn execute_stages_if(&mut self, registry: &mut Registry, predicate: impl Fn(&str) -> bool) {
        for stage in &mut self.stages {
            if predicate(stage.name()) {
                stage.execute(registry);
            }
        }
    }

    pub(crate) fn teardown(&mut self) {
        for stage in &mut self.stages {
            stage.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SystemError;

    struct Counting {
        label: &'static str,
        log: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
        fail: bool,
    }

    impl System for Counting {
        fn process(&mut self, _registry: &mut Registry) -> Result<(), SystemError> {
            self.log.borrow_mut().push(self.label);
            if self.fail {
                return Err("boom".into());
            }
            Ok(())
        }
    }

    #[test]
    fn stage_gating_skips_disabled_stage() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add_stage("update", StageConfig::default()).unwrap();
        pipeline
            .add_stage(
                "debug",
                StageConfig {
                    enabled: false,
                    ..StageConfig::default()
                },
            )
            .unwrap();
        pipeline
            .add_system(
                "update",
                Counting {
                    label: "update",
                    log: log.clone(),
                    fail: false,
                },
            )
            .unwrap();
        pipeline
            .add_system(
                "debug",
                Counting {
                    label: "debug",
                    log: log.clone(),
                    fail: false,
                },
            )
            .unwrap();

        let mut registry = Registry::new(crate::registry::RegistryConfig::default());
        pipeline.execute(&mut registry);
        assert_eq!(*log.borrow(), vec!["update"]);

        pipeline.get_stage_mut("debug").unwrap().set_enabled(true);
        log.borrow_mut().clear();
        pipeline.execute(&mut registry);
        assert_eq!(*log.borrow(), vec!["update", "debug"]);
    }

    #[test]
    fn continue_on_error_gates_sibling_system_execution() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline
            .add_stage(
                "update",
                StageConfig {
                    continue_on_error: false,
                    ..StageConfig::default()
                },
            )
            .unwrap();
        pipeline
            .add_system(
                "update",
                Counting {
                    label: "s1",
                    log: log.clone(),
                    fail: true,
                },
            )
            .unwrap();
        pipeline
            .add_system(
                "update",
                Counting {
                    label: "s2",
                    log: log.clone(),
                    fail: false,
                },
            )
            .unwrap();

        let mut registry = Registry::new(crate::registry::RegistryConfig::default());
        pipeline.execute(&mut registry);
        assert_eq!(*log.borrow(), vec!["s1"]);

        pipeline.get_stage_mut("update").unwrap().config.continue_on_error = true;
        log.borrow_mut().clear();
        pipeline.execute(&mut registry);
        assert_eq!(*log.borrow(), vec!["s1", "s2"]);
    }

    #[test]
    fn duplicate_stage_name_is_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.add_stage("update", StageConfig::default()).unwrap();
        assert!(matches!(
            pipeline.add_stage("update", StageConfig::default()),
            Err(EcsError::DuplicateStage(_))
        ));
    }
}
