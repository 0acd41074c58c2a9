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

//! Plugins: a name paired with initialization and teardown callbacks,
//! invoked by the registry. Trivial by design -- everything interesting
//! about "what a plugin does" happens inside `init`/`teardown` themselves,
//! which have full `&mut Registry` access to register resources, stages
//! and systems.

use crate::registry::Registry;

pub struct Plugin {
    pub name: String,
    pub init: fn(&mut Registry),
    pub teardown: Option<fn(&mut Registry)>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, init: fn(&mut Registry)) -> Self {
        Self {
            name: name.into(),
            init,
            teardown: None,
        }
    }

    pub fn with_teardown(mut self, teardown: fn(&mut Registry)) -> Self {
        self.teardown = Some(teardown);
        self
    }
}
