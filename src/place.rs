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

//! A place of the net: a token counter plus optional on-enter / on-exit
//! callbacks dispatched through the configured executor.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::error;
use parking_lot::RwLock;

use crate::error::{PetriNetError, Result};
use crate::executor::ActionsExecutor;
use crate::properties::{ActionFn, PlaceProperties};

/// Cadence of the cooperative wait on the block-on-enter flag.
const BLOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) struct Place {
    name: String,
    on_enter_action_name: Option<String>,
    on_enter_action: Option<ActionFn>,
    on_exit_action_name: Option<String>,
    on_exit_action: Option<ActionFn>,
    input: bool,
    token_count: RwLock<usize>,
    on_enter_in_execution: Arc<AtomicUsize>,
    on_exit_in_execution: Arc<AtomicUsize>,
    block_on_enter: AtomicBool,
    executor: RwLock<Arc<dyn ActionsExecutor>>,
    // Engine-wide bound on the block-on-enter wait, in milliseconds;
    // 0 means wait without bound.
    block_timeout_ms: Arc<AtomicU64>,
}

impl Place {
    pub fn new(
        properties: PlaceProperties,
        executor: Arc<dyn ActionsExecutor>,
        block_timeout_ms: Arc<AtomicU64>,
    ) -> Self {
        Place {
            name: properties.name,
            on_enter_action_name: properties.on_enter_action_name,
            on_enter_action: properties.on_enter_action,
            on_exit_action_name: properties.on_exit_action_name,
            on_exit_action: properties.on_exit_action,
            input: properties.input,
            token_count: RwLock::new(properties.initial_tokens),
            on_enter_in_execution: Arc::new(AtomicUsize::new(0)),
            on_exit_in_execution: Arc::new(AtomicUsize::new(0)),
            block_on_enter: AtomicBool::new(false),
            executor: RwLock::new(executor),
            block_timeout_ms,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_input(&self) -> bool {
        self.input
    }

    pub fn token_count(&self) -> usize {
        *self.token_count.read()
    }

    pub fn is_on_enter_in_execution(&self) -> bool {
        self.on_enter_in_execution.load(Ordering::Acquire) > 0
    }

    pub fn is_on_exit_in_execution(&self) -> bool {
        self.on_exit_in_execution.load(Ordering::Acquire) > 0
    }

    /// Adds `tokens` and schedules the on-enter callback. This is the path
    /// for external deposits: it honors the block-on-enter flag, waiting for
    /// it to clear before the callback may start.
    pub fn enter_place(&self, tokens: usize) -> Result<()> {
        self.increase_token_count(tokens)?;
        if self.on_enter_action.is_some() {
            self.wait_until_enter_unblocked()?;
            self.dispatch_on_enter();
        }
        Ok(())
    }

    /// Credit path used by a firing transition. The firing thread owns the
    /// block flag it set on its activation places, so this path must not
    /// wait on it: a self-loop transition would otherwise wait on itself.
    /// The in-execution counter still records the callback.
    pub fn enter_place_from_transit(&self, tokens: usize) -> Result<()> {
        self.increase_token_count(tokens)?;
        if self.on_enter_action.is_some() {
            self.dispatch_on_enter();
        }
        Ok(())
    }

    /// Removes `tokens` and schedules the on-exit callback. `tokens == 0`
    /// resets the count to zero.
    pub fn exit_place(&self, tokens: usize) -> Result<()> {
        {
            let mut count = self.token_count.write();
            if tokens == 0 {
                *count = 0;
            } else if *count < tokens {
                return Err(PetriNetError::NotEnoughTokens(self.name.clone()));
            } else {
                *count -= tokens;
            }
        }
        if let Some(action) = &self.on_exit_action {
            self.dispatch(Arc::clone(action), &self.on_exit_in_execution);
        }
        Ok(())
    }

    /// Unconditional assignment; never fires callbacks. Used by input-place
    /// reset.
    pub fn set_token_count(&self, tokens: usize) {
        *self.token_count.write() = tokens;
    }

    /// Callback-free credit, used to compensate an aborted transit.
    pub fn add_tokens_raw(&self, tokens: usize) {
        let mut count = self.token_count.write();
        *count = count.saturating_add(tokens);
    }

    /// Callback-free debit, used to compensate an aborted transit.
    pub fn remove_tokens_raw(&self, tokens: usize) {
        let mut count = self.token_count.write();
        *count = count.saturating_sub(tokens);
    }

    /// Whether a credit of `tokens` would overflow the counter.
    pub fn can_accept(&self, tokens: usize) -> Result<()> {
        let count = self.token_count.read();
        count
            .checked_add(tokens)
            .map(|_| ())
            .ok_or_else(|| PetriNetError::Overflow(self.name.clone()))
    }

    pub fn block_starting_on_enter_actions(&self, value: bool) {
        self.block_on_enter.store(value, Ordering::Release);
    }

    pub fn set_actions_executor(&self, executor: Arc<dyn ActionsExecutor>) {
        *self.executor.write() = executor;
    }

    /// Point-in-time snapshot. The current token count is exported as the
    /// initial count so a snapshot taken mid-run rebuilds the observed
    /// marking; callback identity is re-resolved through the registry.
    pub fn properties(&self) -> PlaceProperties {
        PlaceProperties {
            name: self.name.clone(),
            initial_tokens: self.token_count(),
            on_enter_action_name: self.on_enter_action_name.clone(),
            on_exit_action_name: self.on_exit_action_name.clone(),
            on_enter_action: None,
            on_exit_action: None,
            input: self.input,
        }
    }

    fn increase_token_count(&self, tokens: usize) -> Result<()> {
        if tokens == 0 {
            return Err(PetriNetError::NullTokens);
        }
        let mut count = self.token_count.write();
        *count = count
            .checked_add(tokens)
            .ok_or_else(|| PetriNetError::Overflow(self.name.clone()))?;
        Ok(())
    }

    fn dispatch_on_enter(&self) {
        // Option checked by the callers; unreachable when absent.
        if let Some(action) = &self.on_enter_action {
            self.dispatch(Arc::clone(action), &self.on_enter_in_execution);
        }
    }

    /// Hands the callback to the executor. The in-execution counter is
    /// incremented before dispatch and decremented on the thread that ran
    /// the callback; panics are caught there so user code cannot take the
    /// net down.
    fn dispatch(&self, action: ActionFn, in_execution: &Arc<AtomicUsize>) {
        in_execution.fetch_add(1, Ordering::AcqRel);
        let counter = Arc::clone(in_execution);
        let place_name = self.name.clone();
        let executor = Arc::clone(&*self.executor.read());
        executor.execute(Box::new(move || {
            if catch_unwind(AssertUnwindSafe(|| action())).is_err() {
                error!("callback of place {place_name} panicked");
            }
            counter.fetch_sub(1, Ordering::AcqRel);
        }));
    }

    fn wait_until_enter_unblocked(&self) -> Result<()> {
        if !self.block_on_enter.load(Ordering::Acquire) {
            return Ok(());
        }
        let timeout_ms = self.block_timeout_ms.load(Ordering::Acquire);
        let started = Instant::now();
        while self.block_on_enter.load(Ordering::Acquire) {
            if timeout_ms > 0 {
                let elapsed = started.elapsed();
                if elapsed >= Duration::from_millis(timeout_ms) {
                    return Err(PetriNetError::OnEnterBlockTimeout(self.name.clone()));
                }
                let remaining = Duration::from_millis(timeout_ms) - elapsed;
                thread::sleep(remaining.min(BLOCK_POLL_INTERVAL));
            } else {
                thread::sleep(BLOCK_POLL_INTERVAL);
            }
        }
        Ok(())
    }
}
