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

//! A multithreaded Place/Transition net execution engine.
//!
//! Describe a Petri net — places holding tokens, transitions with weighted
//! activation, destination and inhibitor arcs, guard predicates — attach
//! callbacks to places, and execute it. Enabled transitions fire in random
//! order (no transition is privileged), tokens transit atomically, and
//! callbacks run under one of four threading disciplines: inline, on the
//! event loop thread, through a FIFO job queue, or on detached threads.
//!
//! ```
//! use petriflow::{
//!     ActionsThreadOption, ArcKind, ArcProperties, PetriNetEngine, PlaceProperties,
//!     TransitionProperties,
//! };
//!
//! let engine = PetriNetEngine::new(ActionsThreadOption::SingleThread);
//!
//! engine.create_place(PlaceProperties {
//!     name: "Input".to_string(),
//!     input: true,
//!     ..Default::default()
//! })?;
//! engine.create_place(PlaceProperties {
//!     name: "Done".to_string(),
//!     ..Default::default()
//! })?;
//! engine.create_transition(&TransitionProperties {
//!     name: "Process".to_string(),
//!     activation_arcs: vec![ArcProperties {
//!         place_name: "Input".to_string(),
//!         ..Default::default()
//!     }],
//!     destination_arcs: vec![ArcProperties {
//!         place_name: "Done".to_string(),
//!         kind: ArcKind::Destination,
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! })?;
//!
//! engine.increment_input_place("Input")?;
//! engine.execute(false)?;
//!
//! assert_eq!(engine.token_count("Done")?, 1);
//! # Ok::<(), petriflow::PetriNetError>(())
//! ```

mod engine;
mod error;
mod event_loop;
mod executor;
mod job_queue;
mod managers;
mod net;
mod place;
mod properties;
mod registry;
mod transition;

pub use engine::PetriNetEngine;
pub use error::{PetriNetError, Result};
pub use properties::{
    ActionFn, ActionsThreadOption, ArcKind, ArcProperties, ConditionFn, PlaceProperties,
    TransitionProperties,
};
