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

//! Name-indexed stores for places and transitions. The net owns its
//! entities through these managers; transitions only ever hold weak
//! references back into the places store.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Weak};

use log::error;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::error::{PetriNetError, Result};
use crate::executor::ActionsExecutor;
use crate::place::Place;
use crate::properties::{PlaceProperties, TransitionProperties};
use crate::transition::Transition;

#[derive(Default)]
struct PlacesInner {
    items: HashMap<String, Arc<Place>>,
    input_places: Vec<Weak<Place>>,
}

pub(crate) struct PlacesManager {
    inner: RwLock<PlacesInner>,
}

impl PlacesManager {
    pub fn new() -> Self {
        PlacesManager {
            inner: RwLock::new(PlacesInner::default()),
        }
    }

    pub fn insert(&self, place: Arc<Place>) -> Result<()> {
        if place.name().is_empty() {
            return Err(PetriNetError::invalid_name(place.name()));
        }
        let mut inner = self.inner.write();
        if inner.items.contains_key(place.name()) {
            return Err(PetriNetError::RepeatedPlace(place.name().to_string()));
        }
        if place.is_input() {
            inner.input_places.push(Arc::downgrade(&place));
        }
        inner.items.insert(place.name().to_string(), place);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Place>> {
        self.inner
            .read()
            .items
            .get(name)
            .cloned()
            .ok_or_else(|| PetriNetError::invalid_name(name))
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.items.clear();
        inner.input_places.clear();
    }

    /// Resets every input place to zero tokens without firing callbacks.
    pub fn clear_input_places(&self) {
        let inner = self.inner.read();
        for place in &inner.input_places {
            if let Some(place) = place.upgrade() {
                place.set_token_count(0);
            }
        }
    }

    /// Adds exactly one token to the named input place, firing its on-enter
    /// callback.
    pub fn increment_input_place(&self, name: &str) -> Result<()> {
        let place = self.get(name)?;
        if !place.is_input() {
            return Err(PetriNetError::NotInputPlace(name.to_string()));
        }
        place.enter_place(1)
    }

    pub fn token_count(&self, name: &str) -> Result<usize> {
        Ok(self.get(name)?.token_count())
    }

    /// One `name: tokens` line per place, sorted by name for stable output.
    pub fn print_state(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let inner = self.inner.read();
        let mut names: Vec<&String> = inner.items.keys().collect();
        names.sort();
        for name in names {
            writeln!(out, "{}: {}", name, inner.items[name].token_count())?;
        }
        Ok(())
    }

    pub fn properties(&self) -> Vec<PlaceProperties> {
        let inner = self.inner.read();
        let mut properties: Vec<PlaceProperties> =
            inner.items.values().map(|place| place.properties()).collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        properties
    }

    pub fn set_actions_executor(&self, executor: &Arc<dyn ActionsExecutor>) {
        let inner = self.inner.read();
        for place in inner.items.values() {
            place.set_actions_executor(Arc::clone(executor));
        }
    }
}

pub(crate) struct TransitionsManager {
    items: RwLock<HashMap<String, Arc<Transition>>>,
}

impl TransitionsManager {
    pub fn new() -> Self {
        TransitionsManager {
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, transition: Arc<Transition>) -> Result<()> {
        if transition.name().is_empty() {
            return Err(PetriNetError::invalid_name(transition.name()));
        }
        let mut items = self.items.write();
        if items.contains_key(transition.name()) {
            return Err(PetriNetError::RepeatedTransition(
                transition.name().to_string(),
            ));
        }
        items.insert(transition.name().to_string(), transition);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Transition>> {
        self.items
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PetriNetError::invalid_name(name))
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// The currently enabled transitions in random order. Shuffling is the
    /// net's fairness device: no transition is privileged across iterations.
    pub fn collect_enabled_randomly(&self) -> Vec<Arc<Transition>> {
        let items = self.items.read();
        let mut enabled: Vec<Arc<Transition>> = Vec::new();
        for transition in items.values() {
            match transition.is_enabled() {
                Ok(true) => enabled.push(Arc::clone(transition)),
                Ok(false) => {}
                Err(e) => error!(
                    "skipping transition {}: enabledness check failed: {e}",
                    transition.name()
                ),
            }
        }
        enabled.shuffle(&mut thread_rng());
        enabled
    }

    pub fn properties(&self) -> Result<Vec<TransitionProperties>> {
        let items = self.items.read();
        let mut properties: Vec<TransitionProperties> = items
            .values()
            .map(|transition| transition.properties())
            .collect::<Result<_>>()?;
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use crate::executor::SingleThreadExecutor;
    use crate::properties::ActionFn;

    fn make_place(name: &str, tokens: usize, input: bool, on_enter: Option<ActionFn>) -> Arc<Place> {
        Arc::new(Place::new(
            PlaceProperties {
                name: name.to_string(),
                initial_tokens: tokens,
                on_enter_action: on_enter,
                input,
                ..Default::default()
            },
            Arc::new(SingleThreadExecutor),
            Arc::new(AtomicU64::new(0)),
        ))
    }

    #[test]
    fn insert_rejects_duplicates_and_empty_names() {
        let manager = PlacesManager::new();
        manager.insert(make_place("P", 0, false, None)).unwrap();
        assert!(matches!(
            manager.insert(make_place("P", 0, false, None)).unwrap_err(),
            PetriNetError::RepeatedPlace(_)
        ));
        assert!(matches!(
            manager.insert(make_place("", 0, false, None)).unwrap_err(),
            PetriNetError::InvalidName(_)
        ));
    }

    #[test]
    fn increment_rejects_non_input_places() {
        let manager = PlacesManager::new();
        manager.insert(make_place("P", 0, false, None)).unwrap();
        assert!(matches!(
            manager.increment_input_place("P").unwrap_err(),
            PetriNetError::NotInputPlace(_)
        ));
        assert!(matches!(
            manager.increment_input_place("missing").unwrap_err(),
            PetriNetError::InvalidName(_)
        ));
    }

    #[test]
    fn clear_input_places_resets_without_callbacks() {
        let manager = PlacesManager::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_action = Arc::clone(&hits);
        manager
            .insert(make_place(
                "In",
                4,
                true,
                Some(Arc::new(move || {
                    hits_in_action.fetch_add(1, Ordering::SeqCst);
                })),
            ))
            .unwrap();
        manager.insert(make_place("Other", 2, false, None)).unwrap();

        manager.clear_input_places();
        assert_eq!(manager.token_count("In").unwrap(), 0);
        assert_eq!(manager.token_count("Other").unwrap(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn print_state_lists_every_place() {
        let manager = PlacesManager::new();
        manager.insert(make_place("B", 2, false, None)).unwrap();
        manager.insert(make_place("A", 1, true, None)).unwrap();

        let mut out = Vec::new();
        manager.print_state(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A: 1\nB: 2\n");
    }

    #[test]
    fn enabled_collection_only_returns_enabled_transitions() {
        let places = PlacesManager::new();
        let ready = make_place("Ready", 1, false, None);
        let starved = make_place("Starved", 0, false, None);
        let sink = make_place("Sink", 0, false, None);
        places.insert(Arc::clone(&ready)).unwrap();
        places.insert(Arc::clone(&starved)).unwrap();
        places.insert(Arc::clone(&sink)).unwrap();

        let transitions = TransitionsManager::new();
        let make_transition = |name: &str, from: &Arc<Place>| {
            Arc::new(
                Transition::new(
                    name.to_string(),
                    vec![crate::transition::TransArc {
                        place: Arc::downgrade(from),
                        weight: 1,
                    }],
                    vec![crate::transition::TransArc {
                        place: Arc::downgrade(&sink),
                        weight: 1,
                    }],
                    vec![],
                    vec![],
                    false,
                )
                .unwrap(),
            )
        };
        transitions.insert(make_transition("T1", &ready)).unwrap();
        transitions.insert(make_transition("T2", &starved)).unwrap();

        let enabled = transitions.collect_enabled_randomly();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name(), "T1");
    }

    #[test]
    fn duplicate_transition_names_are_rejected() {
        let transitions = TransitionsManager::new();
        let t = |name: &str| {
            Arc::new(
                Transition::new(name.to_string(), vec![], vec![], vec![], vec![], false).unwrap(),
            )
        };
        transitions.insert(t("T")).unwrap();
        assert!(matches!(
            transitions.insert(t("T")).unwrap_err(),
            PetriNetError::RepeatedTransition(_)
        ));
    }
}
