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

//! The net itself: entity stores, callback registries, the configured
//! executor, and the firing engine that the event loop drives.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use parking_lot::RwLock;

use crate::error::{PetriNetError, Result};
use crate::executor::{executor_for, ActionsExecutor};
use crate::managers::{PlacesManager, TransitionsManager};
use crate::place::Place;
use crate::properties::{
    ActionFn, ActionsThreadOption, ArcProperties, ConditionFn, PlaceProperties,
    TransitionProperties,
};
use crate::registry::CallbackRegistry;
use crate::transition::{TransArc, Transition};

/// Default bound on the block-on-enter wait.
const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct PetriNet {
    places: PlacesManager,
    transitions: TransitionsManager,
    actions: CallbackRegistry<ActionFn>,
    conditions: CallbackRegistry<ConditionFn>,
    executor: RwLock<Arc<dyn ActionsExecutor>>,
    thread_option: RwLock<ActionsThreadOption>,
    new_input_received: AtomicBool,
    block_timeout_ms: Arc<AtomicU64>,
}

impl PetriNet {
    pub fn new(thread_option: ActionsThreadOption) -> Self {
        PetriNet {
            places: PlacesManager::new(),
            transitions: TransitionsManager::new(),
            actions: CallbackRegistry::new(),
            conditions: CallbackRegistry::new(),
            executor: RwLock::new(executor_for(thread_option)),
            thread_option: RwLock::new(thread_option),
            new_input_received: AtomicBool::new(false),
            block_timeout_ms: Arc::new(AtomicU64::new(
                DEFAULT_BLOCK_TIMEOUT.as_millis() as u64
            )),
        }
    }

    /// One firing iteration: collect the enabled transitions in random order
    /// and fire each once. Failures of individual transitions are logged and
    /// swallowed so the net stays live. Returns whether anything fired.
    pub fn fire_once(&self, log_state: bool) -> bool {
        self.new_input_received.store(false, Ordering::Release);
        if log_state {
            self.log_state();
        }

        let mut fired = false;
        for transition in self.transitions.collect_enabled_randomly() {
            match transition.fire() {
                Ok(f) => fired |= f,
                Err(e) => error!("transition {} failed to fire: {e}", transition.name()),
            }
        }
        fired
    }

    pub fn create_place(&self, mut properties: PlaceProperties) -> Result<()> {
        if let Some(label) = &properties.on_enter_action_name {
            properties.on_enter_action = Some(self.actions.get(label)?);
        }
        if let Some(label) = &properties.on_exit_action_name {
            properties.on_exit_action = Some(self.actions.get(label)?);
        }
        let place = Arc::new(Place::new(
            properties,
            Arc::clone(&*self.executor.read()),
            Arc::clone(&self.block_timeout_ms),
        ));
        self.places.insert(place)
    }

    pub fn create_transition(&self, properties: &TransitionProperties) -> Result<()> {
        if self.transitions.contains(&properties.name) {
            return Err(PetriNetError::RepeatedTransition(properties.name.clone()));
        }

        // Named guards resolve through the registry and win over inline
        // ones; inline guards stay anonymous.
        let conditions: Vec<(String, ConditionFn)> = if !properties.condition_names.is_empty() {
            self.conditions.resolve_named(&properties.condition_names)?
        } else {
            properties
                .conditions
                .iter()
                .map(|condition| (String::new(), Arc::clone(condition)))
                .collect()
        };

        let transition = Transition::new(
            properties.name.clone(),
            self.resolve_arcs(&properties.activation_arcs)?,
            self.resolve_arcs(&properties.destination_arcs)?,
            self.resolve_arcs(&properties.inhibitor_arcs)?,
            conditions,
            properties.require_no_actions_in_execution,
        )?;
        self.transitions.insert(Arc::new(transition))
    }

    pub fn add_arc(&self, properties: &ArcProperties) -> Result<()> {
        let (place, transition) = self.resolve_arc_endpoints(properties)?;
        transition.add_arc(&place, properties.kind, properties.weight)
    }

    pub fn remove_arc(&self, properties: &ArcProperties) -> Result<()> {
        let (place, transition) = self.resolve_arc_endpoints(properties)?;
        transition.remove_arc(place.name(), properties.kind)
    }

    pub fn clear(&self) {
        self.transitions.clear();
        self.places.clear();
    }

    pub fn clear_input_places(&self) {
        self.places.clear_input_places();
        self.new_input_received.store(false, Ordering::Release);
    }

    pub fn increment_input_place(&self, name: &str) -> Result<()> {
        self.places.increment_input_place(name)?;
        self.new_input_received.store(true, Ordering::Release);
        Ok(())
    }

    pub fn register_action(&self, name: &str, action: ActionFn) -> Result<()> {
        self.actions.register(name, action)
    }

    pub fn register_condition(&self, name: &str, condition: ConditionFn) -> Result<()> {
        self.conditions.register(name, condition)
    }

    pub fn token_count(&self, name: &str) -> Result<usize> {
        self.places.token_count(name)
    }

    pub fn print_state(&self, out: &mut dyn Write) -> std::io::Result<()> {
        self.places.print_state(out)
    }

    pub fn places_properties(&self) -> Vec<PlaceProperties> {
        self.places.properties()
    }

    pub fn transitions_properties(&self) -> Result<Vec<TransitionProperties>> {
        self.transitions.properties()
    }

    pub fn thread_option(&self) -> ActionsThreadOption {
        *self.thread_option.read()
    }

    /// Swaps the executor everywhere. The previous executor (and its worker
    /// thread, for the job queue) is dropped once the last place lets go of
    /// it.
    pub fn set_thread_option(&self, option: ActionsThreadOption) {
        let mut current = self.thread_option.write();
        if *current == option {
            return;
        }
        *current = option;
        let executor = executor_for(option);
        *self.executor.write() = Arc::clone(&executor);
        self.places.set_actions_executor(&executor);
    }

    pub fn new_input_received(&self) -> bool {
        self.new_input_received.load(Ordering::Acquire)
    }

    /// Bounds the wait of `enter_place` on the block-on-enter flag.
    /// `None` waits without bound.
    pub fn set_block_timeout(&self, timeout: Option<Duration>) {
        let millis = timeout.map_or(0, |t| t.as_millis() as u64);
        self.block_timeout_ms.store(millis, Ordering::Release);
    }

    fn resolve_arcs(&self, arcs: &[ArcProperties]) -> Result<Vec<TransArc>> {
        arcs.iter()
            .map(|arc| {
                let place = self.places.get(&arc.place_name)?;
                Ok(TransArc {
                    place: Arc::downgrade(&place),
                    weight: arc.weight,
                })
            })
            .collect()
    }

    fn resolve_arc_endpoints(
        &self,
        properties: &ArcProperties,
    ) -> Result<(Arc<Place>, Arc<Transition>)> {
        let place = self.places.get(&properties.place_name).map_err(|_| {
            PetriNetError::invalid_arc_op(format!(
                "place {} does not exist",
                properties.place_name
            ))
        })?;
        let transition = self.transitions.get(&properties.transition_name).map_err(|_| {
            PetriNetError::invalid_arc_op(format!(
                "transition {} does not exist",
                properties.transition_name
            ))
        })?;
        Ok((place, transition))
    }

    fn log_state(&self) {
        let mut buffer = Vec::new();
        if self.print_state(&mut buffer).is_ok() {
            info!(
                "net state:\n{}",
                String::from_utf8_lossy(&buffer).trim_end()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn place(name: &str, tokens: usize, input: bool) -> PlaceProperties {
        PlaceProperties {
            name: name.to_string(),
            initial_tokens: tokens,
            input,
            ..Default::default()
        }
    }

    fn arc(place: &str, kind: crate::properties::ArcKind, weight: usize) -> ArcProperties {
        ArcProperties {
            weight,
            place_name: place.to_string(),
            transition_name: String::new(),
            kind,
        }
    }

    fn simple_net() -> PetriNet {
        let net = PetriNet::new(ActionsThreadOption::SingleThread);
        net.create_place(place("In", 0, true)).unwrap();
        net.create_place(place("Out", 0, false)).unwrap();
        net.create_transition(&TransitionProperties {
            name: "T".to_string(),
            activation_arcs: vec![arc("In", crate::properties::ArcKind::Activation, 1)],
            destination_arcs: vec![arc("Out", crate::properties::ArcKind::Destination, 1)],
            ..Default::default()
        })
        .unwrap();
        net
    }

    #[test]
    fn firing_drains_the_input_place() {
        let net = simple_net();
        net.increment_input_place("In").unwrap();
        assert!(net.new_input_received());

        assert!(net.fire_once(false));
        assert!(!net.new_input_received());
        assert_eq!(net.token_count("In").unwrap(), 0);
        assert_eq!(net.token_count("Out").unwrap(), 1);
        // Quiescent now.
        assert!(!net.fire_once(false));
    }

    #[test]
    fn unknown_place_in_a_transition_fails() {
        let net = PetriNet::new(ActionsThreadOption::SingleThread);
        let err = net
            .create_transition(&TransitionProperties {
                name: "T".to_string(),
                activation_arcs: vec![arc("Ghost", crate::properties::ArcKind::Activation, 1)],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PetriNetError::InvalidName(_)));
    }

    #[test]
    fn action_labels_resolve_through_the_registry() {
        let net = PetriNet::new(ActionsThreadOption::SingleThread);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_action = Arc::clone(&hits);
        net.register_action(
            "count",
            Arc::new(move || {
                hits_in_action.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        net.create_place(PlaceProperties {
            name: "In".to_string(),
            on_enter_action_name: Some("count".to_string()),
            input: true,
            ..Default::default()
        })
        .unwrap();

        net.increment_input_place("In").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unresolved_action_label_fails_place_creation() {
        let net = PetriNet::new(ActionsThreadOption::SingleThread);
        let err = net
            .create_place(PlaceProperties {
                name: "In".to_string(),
                on_enter_action_name: Some("missing".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PetriNetError::InvalidName(_)));
        assert!(!net.places_properties().iter().any(|p| p.name == "In"));
    }

    #[test]
    fn unresolved_condition_label_fails_transition_creation() {
        let net = simple_net();
        let err = net
            .create_transition(&TransitionProperties {
                name: "T2".to_string(),
                activation_arcs: vec![arc("In", crate::properties::ArcKind::Activation, 1)],
                condition_names: vec!["missing".to_string()],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PetriNetError::InvalidName(_)));
    }

    #[test]
    fn add_arc_on_unknown_entities_is_an_arc_error() {
        let net = simple_net();
        let err = net
            .add_arc(&ArcProperties {
                place_name: "Ghost".to_string(),
                transition_name: "T".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PetriNetError::InvalidArcOp(_)));
    }

    #[test]
    fn clear_removes_everything() {
        let net = simple_net();
        net.clear();
        assert!(net.places_properties().is_empty());
        assert!(net.transitions_properties().unwrap().is_empty());
        assert!(matches!(
            net.token_count("In").unwrap_err(),
            PetriNetError::InvalidName(_)
        ));
    }
}
