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

//! Nets wired through the action/condition registries, the way an importer
//! builds them: callbacks referenced by name, resolved at creation time.

use std::sync::Arc;

use parking_lot::Mutex;
use petriflow::{
    ActionsThreadOption, ArcKind, ArcProperties, PetriNetEngine, PetriNetError, PlaceProperties,
    TransitionProperties,
};

struct FactorialState {
    x: usize,
    result: usize,
}

/// Factorial computed by a self-loop: the on-enter action multiplies and
/// decrements, the guards decide between looping and finishing.
fn factorial_engine(x: usize) -> (PetriNetEngine, Arc<Mutex<FactorialState>>) {
    let engine = PetriNetEngine::new(ActionsThreadOption::SingleThread);
    let state = Arc::new(Mutex::new(FactorialState { x, result: 1 }));

    let action_state = Arc::clone(&state);
    engine
        .register_action(
            "factorial_step",
            Arc::new(move || {
                let mut state = action_state.lock();
                state.result *= state.x;
                if state.x > 0 {
                    state.x -= 1;
                }
            }),
        )
        .unwrap();

    let loop_state = Arc::clone(&state);
    engine
        .register_condition("keep_computing", Arc::new(move || loop_state.lock().x > 1))
        .unwrap();
    let done_state = Arc::clone(&state);
    engine
        .register_condition("computation_done", Arc::new(move || done_state.lock().x <= 1))
        .unwrap();

    engine
        .create_place(PlaceProperties {
            name: "Compute".to_string(),
            on_enter_action_name: Some("factorial_step".to_string()),
            input: true,
            ..Default::default()
        })
        .unwrap();
    engine
        .create_place(PlaceProperties {
            name: "Finished".to_string(),
            ..Default::default()
        })
        .unwrap();

    engine
        .create_transition(&TransitionProperties {
            name: "Iterate".to_string(),
            activation_arcs: vec![ArcProperties {
                place_name: "Compute".to_string(),
                ..Default::default()
            }],
            destination_arcs: vec![ArcProperties {
                place_name: "Compute".to_string(),
                kind: ArcKind::Destination,
                ..Default::default()
            }],
            condition_names: vec!["keep_computing".to_string()],
            ..Default::default()
        })
        .unwrap();
    engine
        .create_transition(&TransitionProperties {
            name: "Finish".to_string(),
            activation_arcs: vec![ArcProperties {
                place_name: "Compute".to_string(),
                ..Default::default()
            }],
            destination_arcs: vec![ArcProperties {
                place_name: "Finished".to_string(),
                kind: ArcKind::Destination,
                ..Default::default()
            }],
            condition_names: vec!["computation_done".to_string()],
            ..Default::default()
        })
        .unwrap();

    (engine, state)
}

#[test]
fn factorial_of_six_is_720() {
    let (engine, state) = factorial_engine(6);
    engine.increment_input_place("Compute").unwrap();
    engine.execute(false).unwrap();

    assert_eq!(state.lock().result, 720);
    assert_eq!(engine.token_count("Compute").unwrap(), 0);
    assert_eq!(engine.token_count("Finished").unwrap(), 1);
}

#[test]
fn factorial_of_one_finishes_immediately() {
    let (engine, state) = factorial_engine(1);
    engine.increment_input_place("Compute").unwrap();
    engine.execute(false).unwrap();

    assert_eq!(state.lock().result, 1);
    assert_eq!(engine.token_count("Finished").unwrap(), 1);
}

#[test]
fn duplicate_registrations_are_rejected() {
    let engine = PetriNetEngine::default();
    engine.register_action("a", Arc::new(|| {})).unwrap();
    assert!(matches!(
        engine.register_action("a", Arc::new(|| {})).unwrap_err(),
        PetriNetError::RepeatedFunction(_)
    ));
    engine.register_condition("c", Arc::new(|| true)).unwrap();
    assert!(matches!(
        engine
            .register_condition("c", Arc::new(|| true))
            .unwrap_err(),
        PetriNetError::RepeatedFunction(_)
    ));
}

#[test]
fn empty_function_names_are_rejected() {
    let engine = PetriNetEngine::default();
    assert!(matches!(
        engine.register_action("", Arc::new(|| {})).unwrap_err(),
        PetriNetError::InvalidName(_)
    ));
}

#[test]
fn place_referencing_an_unknown_action_fails() {
    let engine = PetriNetEngine::default();
    let err = engine
        .create_place(PlaceProperties {
            name: "P".to_string(),
            on_exit_action_name: Some("nowhere".to_string()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, PetriNetError::InvalidName(_)));
}

/// The property snapshots must carry enough to rebuild an equivalent net,
/// with callback identity re-resolved through the registry.
#[test]
fn snapshots_rebuild_an_equivalent_net() {
    let (original, _state) = factorial_engine(5);
    original.increment_input_place("Compute").unwrap();

    let places = original.places_properties();
    let transitions = original.transitions_properties().unwrap();

    let (rebuilt, rebuilt_state) = {
        let engine = PetriNetEngine::new(ActionsThreadOption::SingleThread);
        let state = Arc::new(Mutex::new(FactorialState { x: 5, result: 1 }));

        let action_state = Arc::clone(&state);
        engine
            .register_action(
                "factorial_step",
                Arc::new(move || {
                    let mut state = action_state.lock();
                    state.result *= state.x;
                    if state.x > 0 {
                        state.x -= 1;
                    }
                }),
            )
            .unwrap();
        let loop_state = Arc::clone(&state);
        engine
            .register_condition("keep_computing", Arc::new(move || loop_state.lock().x > 1))
            .unwrap();
        let done_state = Arc::clone(&state);
        engine
            .register_condition(
                "computation_done",
                Arc::new(move || done_state.lock().x <= 1),
            )
            .unwrap();

        for place in &places {
            engine.create_place(place.clone()).unwrap();
        }
        for transition in &transitions {
            engine.create_transition(transition).unwrap();
        }
        (engine, state)
    };

    // The snapshot was taken after the injection: the marking carries over.
    assert_eq!(rebuilt.token_count("Compute").unwrap(), 1);

    // The rebuilt net resolves the same action and guard names against its
    // own registry and computes the full factorial from its fresh state.
    rebuilt.execute(false).unwrap();
    assert_eq!(rebuilt.token_count("Finished").unwrap(), 1);
    assert_eq!(rebuilt_state.lock().result, 120);

    // Snapshots of the rebuilt net agree with the original's.
    let rebuilt_places = rebuilt.places_properties();
    assert_eq!(places.len(), rebuilt_places.len());
    for (a, b) in places.iter().zip(&rebuilt_places) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.input, b.input);
        assert_eq!(a.on_enter_action_name, b.on_enter_action_name);
        assert_eq!(a.on_exit_action_name, b.on_exit_action_name);
    }
    let rebuilt_transitions = rebuilt.transitions_properties().unwrap();
    for (a, b) in transitions.iter().zip(&rebuilt_transitions) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.condition_names, b.condition_names);
        assert_eq!(a.activation_arcs.len(), b.activation_arcs.len());
        assert_eq!(a.destination_arcs.len(), b.destination_arcs.len());
    }
}

#[test]
fn snapshots_serialize_to_json() {
    let (engine, _state) = factorial_engine(3);
    let places = engine.places_properties();
    let transitions = engine.transitions_properties().unwrap();

    let json = serde_json::to_string(&(places, transitions)).unwrap();
    let (places, transitions): (Vec<PlaceProperties>, Vec<TransitionProperties>) =
        serde_json::from_str(&json).unwrap();

    assert!(places.iter().any(|p| p.name == "Compute" && p.input));
    assert!(transitions
        .iter()
        .any(|t| t.name == "Iterate" && t.condition_names == ["keep_computing"]));
}
