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

//! The public engine facade. Every method synchronizes on the engine's
//! reader-writer lock before delegating, and the rules that keep the net
//! consistent (no structural change while running, input notification,
//! snapshot isolation) are enforced here.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{PetriNetError, Result};
use crate::event_loop::EventLoop;
use crate::net::PetriNet;
use crate::properties::{
    ActionFn, ActionsThreadOption, ArcProperties, ConditionFn, PlaceProperties,
    TransitionProperties,
};

struct EngineInner {
    net: Arc<PetriNet>,
    event_loop: EventLoop,
}

/// A Place/Transition net execution engine.
///
/// Build the net while stopped, register callbacks, then `execute` it:
/// enabled transitions fire in random order, tokens move, and on-enter /
/// on-exit callbacks run under the configured [`ActionsThreadOption`].
/// Everything is per-instance; engines are `Send + Sync` and can be shared
/// behind an `Arc`.
///
/// Callbacks and guards must not call back into the engine that invoked
/// them: the engine lock is held while they run in the inline modes.
pub struct PetriNetEngine {
    inner: RwLock<EngineInner>,
}

impl PetriNetEngine {
    pub fn new(thread_option: ActionsThreadOption) -> Self {
        PetriNetEngine {
            inner: RwLock::new(EngineInner {
                net: Arc::new(PetriNet::new(thread_option)),
                event_loop: EventLoop::new(),
            }),
        }
    }

    /// Creates a place. When an action label is set, it must resolve in the
    /// action registry and wins over any inline callback. Fails while the
    /// event loop is running.
    pub fn create_place(&self, properties: PlaceProperties) -> Result<()> {
        let inner = self.inner.write();
        Self::ensure_stopped(&inner, "create a place")?;
        inner.net.create_place(properties)
    }

    /// Creates a transition over already-created places. Named guards
    /// resolve through the condition registry. Fails while the event loop is
    /// running.
    pub fn create_transition(&self, properties: &TransitionProperties) -> Result<()> {
        let inner = self.inner.write();
        Self::ensure_stopped(&inner, "create a transition")?;
        inner.net.create_transition(properties)
    }

    /// Attaches an arc to an existing place/transition pair. Fails while the
    /// event loop is running.
    pub fn add_arc(&self, properties: &ArcProperties) -> Result<()> {
        let inner = self.inner.write();
        Self::ensure_stopped(&inner, "add an arc")?;
        inner.net.add_arc(properties)
    }

    /// Detaches an arc. Fails while the event loop is running.
    pub fn remove_arc(&self, properties: &ArcProperties) -> Result<()> {
        let inner = self.inner.write();
        Self::ensure_stopped(&inner, "remove an arc")?;
        inner.net.remove_arc(properties)
    }

    /// Drops every place and transition. Fails while the event loop is
    /// running.
    pub fn clear_net(&self) -> Result<()> {
        let inner = self.inner.write();
        Self::ensure_stopped(&inner, "clear the net")?;
        inner.net.clear();
        Ok(())
    }

    /// Registers a named action for places to reference by label.
    pub fn register_action(&self, name: &str, action: ActionFn) -> Result<()> {
        self.inner.write().net.register_action(name, action)
    }

    /// Registers a named guard for transitions to reference by label.
    pub fn register_condition(&self, name: &str, condition: ConditionFn) -> Result<()> {
        self.inner.write().net.register_condition(name, condition)
    }

    /// Starts execution. Under `SingleThread` this drains the net to
    /// quiescence before returning; under the other options it starts the
    /// event loop and returns immediately. `log_state` logs the marking at
    /// each iteration through the `log` facade.
    pub fn execute(&self, log_state: bool) -> Result<()> {
        let inner = self.inner.write();
        inner.event_loop.start(Arc::clone(&inner.net), log_state)
    }

    /// Stops the event loop and waits for its thread to exit. Idempotent
    /// and infallible; callbacks already running (job queue, detached) are
    /// not interrupted and may outlive the loop.
    pub fn stop(&self) {
        self.inner.write().event_loop.stop();
    }

    pub fn is_event_loop_running(&self) -> bool {
        self.inner.read().event_loop.is_running()
    }

    /// Adds one token to the named input place and wakes the event loop.
    /// Never blocks on the loop itself.
    pub fn increment_input_place(&self, name: &str) -> Result<()> {
        let inner = self.inner.write();
        inner.net.increment_input_place(name)?;
        inner.event_loop.notify_new_event();
        Ok(())
    }

    /// Resets every input place to zero tokens without firing callbacks.
    pub fn clear_input_places(&self) {
        self.inner.write().net.clear_input_places();
    }

    /// Reconfigures where callbacks run. Fails while the event loop is
    /// running.
    pub fn set_actions_thread_option(&self, option: ActionsThreadOption) -> Result<()> {
        let inner = self.inner.write();
        Self::ensure_stopped(&inner, "change the actions thread option")?;
        inner.net.set_thread_option(option);
        Ok(())
    }

    pub fn actions_thread_option(&self) -> ActionsThreadOption {
        self.inner.read().net.thread_option()
    }

    /// Sets the idle watchdog period of the event loop; takes effect on the
    /// next wait.
    pub fn set_event_loop_sleep_duration(&self, duration: Duration) {
        self.inner.write().event_loop.set_sleep_duration(duration);
    }

    pub fn event_loop_sleep_duration(&self) -> Duration {
        self.inner.read().event_loop.sleep_duration()
    }

    /// Bounds how long an external deposit waits for a blocked on-enter
    /// callback slot; `None` waits without bound. Expiry surfaces as
    /// [`PetriNetError::OnEnterBlockTimeout`].
    pub fn set_on_enter_block_timeout(&self, timeout: Option<Duration>) {
        self.inner.write().net.set_block_timeout(timeout);
    }

    /// Number of tokens currently in the named place.
    pub fn token_count(&self, name: &str) -> Result<usize> {
        self.inner.read().net.token_count(name)
    }

    /// Writes one `name: tokens` line per place.
    pub fn print_state(&self, out: &mut dyn Write) -> std::io::Result<()> {
        self.inner.read().net.print_state(out)
    }

    /// Owned snapshot of every place, suitable for export; rebuilding from
    /// it re-resolves callbacks through the registry.
    pub fn places_properties(&self) -> Vec<PlaceProperties> {
        self.inner.read().net.places_properties()
    }

    /// Owned snapshot of every transition.
    pub fn transitions_properties(&self) -> Result<Vec<TransitionProperties>> {
        self.inner.read().net.transitions_properties()
    }

    fn ensure_stopped(inner: &EngineInner, operation: &str) -> Result<()> {
        if inner.event_loop.is_running() {
            return Err(PetriNetError::already_running(operation));
        }
        Ok(())
    }
}

impl Default for PetriNetEngine {
    fn default() -> Self {
        PetriNetEngine::new(ActionsThreadOption::default())
    }
}

impl Drop for PetriNetEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
