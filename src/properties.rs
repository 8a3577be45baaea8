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

//! Property records describing places, transitions and arcs. These are the
//! exchange format between the engine and external builders (importers,
//! exporters, controllers): plain data plus optional inline callbacks.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PetriNetError;

/// A callback invoked when tokens enter or leave a place.
pub type ActionFn = Arc<dyn Fn() + Send + Sync>;

/// A guard predicate attached to a transition.
pub type ConditionFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// How an arc connects a place to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcKind {
    /// Tokens are consumed from the place when the transition fires.
    Activation,
    /// Tokens are produced into the place when the transition fires.
    Destination,
    /// Shorthand for one activation arc plus one destination arc.
    Bidirectional,
    /// The place must be empty for the transition to fire.
    Inhibitor,
}

impl fmt::Display for ArcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArcKind::Activation => "ACTIVATION",
            ArcKind::Destination => "DESTINATION",
            ArcKind::Bidirectional => "BIDIRECTIONAL",
            ArcKind::Inhibitor => "INHIBITOR",
        };
        f.write_str(s)
    }
}

impl FromStr for ArcKind {
    type Err = PetriNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVATION" => Ok(ArcKind::Activation),
            "DESTINATION" => Ok(ArcKind::Destination),
            "BIDIRECTIONAL" => Ok(ArcKind::Bidirectional),
            "INHIBITOR" => Ok(ArcKind::Inhibitor),
            other => Err(PetriNetError::invalid_config(format!(
                "unknown arc kind: {other}"
            ))),
        }
    }
}

/// Where user callbacks run while the net executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionsThreadOption {
    /// Callbacks run inline on the thread driving the firing iteration;
    /// `execute` drains the net to quiescence before returning.
    SingleThread,
    /// Callbacks run inline on the dedicated event loop thread.
    EventLoop,
    /// Callbacks are queued and run in order by a single worker thread.
    JobQueue,
    /// Every callback runs on its own detached thread.
    Detached,
}

impl Default for ActionsThreadOption {
    fn default() -> Self {
        ActionsThreadOption::JobQueue
    }
}

impl fmt::Display for ActionsThreadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionsThreadOption::SingleThread => "SINGLE_THREAD",
            ActionsThreadOption::EventLoop => "EVENT_LOOP",
            ActionsThreadOption::JobQueue => "JOB_QUEUE",
            ActionsThreadOption::Detached => "DETACHED",
        };
        f.write_str(s)
    }
}

impl FromStr for ActionsThreadOption {
    type Err = PetriNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE_THREAD" => Ok(ActionsThreadOption::SingleThread),
            "EVENT_LOOP" => Ok(ActionsThreadOption::EventLoop),
            "JOB_QUEUE" => Ok(ActionsThreadOption::JobQueue),
            "DETACHED" => Ok(ActionsThreadOption::Detached),
            other => Err(PetriNetError::invalid_config(format!(
                "unknown actions thread option: {other}"
            ))),
        }
    }
}

/// One arc of a transition, referencing its place by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcProperties {
    /// Number of tokens moved (or, for inhibitor arcs, stored but unused:
    /// any token blocks).
    pub weight: usize,
    pub place_name: String,
    pub transition_name: String,
    pub kind: ArcKind,
}

impl Default for ArcProperties {
    fn default() -> Self {
        ArcProperties {
            weight: 1,
            place_name: String::new(),
            transition_name: String::new(),
            kind: ArcKind::Activation,
        }
    }
}

/// Everything needed to create a place.
///
/// Callbacks can be given inline or by registry label; when a label is set it
/// wins and is resolved through the engine's action registry.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PlaceProperties {
    pub name: String,
    pub initial_tokens: usize,
    pub on_enter_action_name: Option<String>,
    pub on_exit_action_name: Option<String>,
    #[serde(skip)]
    pub on_enter_action: Option<ActionFn>,
    #[serde(skip)]
    pub on_exit_action: Option<ActionFn>,
    /// Whether external callers may inject tokens into this place.
    pub input: bool,
}

impl fmt::Debug for PlaceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceProperties")
            .field("name", &self.name)
            .field("initial_tokens", &self.initial_tokens)
            .field("on_enter_action_name", &self.on_enter_action_name)
            .field("on_exit_action_name", &self.on_exit_action_name)
            .field("on_enter_action", &self.on_enter_action.is_some())
            .field("on_exit_action", &self.on_exit_action.is_some())
            .field("input", &self.input)
            .finish()
    }
}

/// Everything needed to create a transition.
///
/// Guards follow the same rule as place callbacks: when `condition_names` is
/// non-empty the names are resolved through the condition registry and the
/// inline `conditions` are ignored; otherwise the inline ones are used as
/// anonymous guards.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TransitionProperties {
    pub name: String,
    pub activation_arcs: Vec<ArcProperties>,
    pub destination_arcs: Vec<ArcProperties>,
    pub inhibitor_arcs: Vec<ArcProperties>,
    pub condition_names: Vec<String>,
    #[serde(skip)]
    pub conditions: Vec<ConditionFn>,
    /// When set, the transition only fires if no activation place has an
    /// on-enter callback still running.
    pub require_no_actions_in_execution: bool,
}

impl fmt::Debug for TransitionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionProperties")
            .field("name", &self.name)
            .field("activation_arcs", &self.activation_arcs)
            .field("destination_arcs", &self.destination_arcs)
            .field("inhibitor_arcs", &self.inhibitor_arcs)
            .field("condition_names", &self.condition_names)
            .field("conditions", &self.conditions.len())
            .field(
                "require_no_actions_in_execution",
                &self.require_no_actions_in_execution,
            )
            .finish()
    }
}
