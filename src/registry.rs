// Copyright 2025 ZETA RETICULA INC
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

//! Name-indexed registry for user callbacks. Nets imported from an external
//! description reference their actions and guards by name; those names must
//! resolve here before the referencing place or transition can be created.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{PetriNetError, Result};

pub(crate) struct CallbackRegistry<T: Clone> {
    items: DashMap<String, T>,
}

impl<T: Clone> CallbackRegistry<T> {
    pub fn new() -> Self {
        CallbackRegistry {
            items: DashMap::new(),
        }
    }

    /// Registers `item` under `name`. The empty string is never a valid name
    /// and a name can only be registered once.
    pub fn register(&self, name: &str, item: T) -> Result<()> {
        if name.is_empty() {
            return Err(PetriNetError::invalid_name(name));
        }
        match self.items.entry(name.to_string()) {
            Entry::Occupied(_) => Err(PetriNetError::RepeatedFunction(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<T> {
        if name.is_empty() {
            return Err(PetriNetError::invalid_name(name));
        }
        self.items
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PetriNetError::invalid_name(name))
    }

    /// Bulk lookup preserving the input order. Any unknown name fails the
    /// whole resolution.
    pub fn resolve_named(&self, names: &[String]) -> Result<Vec<(String, T)>> {
        names
            .iter()
            .map(|name| self.get(name).map(|item| (name.clone(), item)))
            .collect()
    }
}
