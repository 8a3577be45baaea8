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

//! The background loop driving firing iterations: fire while something
//! moves, otherwise sleep on a condition variable until a new input arrives
//! or the watchdog period elapses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::{PetriNetError, Result};
use crate::net::PetriNet;
use crate::properties::ActionsThreadOption;

const DEFAULT_SLEEP_DURATION: Duration = Duration::from_millis(100);

pub(crate) struct EventLoop {
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    notifier: Arc<(Mutex<()>, Condvar)>,
    sleep_duration: Arc<RwLock<Duration>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop {
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            notifier: Arc::new((Mutex::new(()), Condvar::new())),
            sleep_duration: Arc::new(RwLock::new(DEFAULT_SLEEP_DURATION)),
            worker: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts execution. Under `SingleThread` the net is drained to
    /// quiescence on the calling thread and the loop never enters the
    /// running state; otherwise a worker thread takes over.
    pub fn start(&self, net: Arc<PetriNet>, log_state: bool) -> Result<()> {
        if self.is_running() {
            return Err(PetriNetError::already_running("execute"));
        }

        if net.thread_option() == ActionsThreadOption::SingleThread {
            while net.fire_once(log_state) {}
            return Ok(());
        }

        self.stop_requested.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);

        let running = Arc::clone(&self.running);
        let stop_requested = Arc::clone(&self.stop_requested);
        let notifier = Arc::clone(&self.notifier);
        let sleep_duration = Arc::clone(&self.sleep_duration);
        let handle = thread::spawn(move || {
            debug!("event loop started");
            while !stop_requested.load(Ordering::Acquire) {
                if !net.fire_once(log_state) {
                    let timeout = *sleep_duration.read();
                    let (lock, condvar) = &*notifier;
                    let mut guard = lock.lock();
                    // Re-check under the notifier lock: an input that
                    // arrived after the idle iteration must not be slept
                    // through.
                    if !net.new_input_received() && !stop_requested.load(Ordering::Acquire) {
                        condvar.wait_for(&mut guard, timeout);
                    }
                }
            }
            running.store(false, Ordering::Release);
            debug!("event loop stopped");
        });
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Requests termination and waits for the loop thread to exit.
    /// Idempotent and infallible; callbacks already running are not
    /// interrupted.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        {
            let _guard = self.notifier.0.lock();
            self.notifier.1.notify_all();
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        self.running.store(false, Ordering::Release);
        self.stop_requested.store(false, Ordering::Release);
    }

    /// Wakes the loop out of its idle wait; called after every input
    /// increment.
    pub fn notify_new_event(&self) {
        let _guard = self.notifier.0.lock();
        self.notifier.1.notify_all();
    }

    /// Changes the watchdog period; a wait already in progress still uses
    /// the old value, the next one picks up the new.
    pub fn set_sleep_duration(&self, duration: Duration) {
        *self.sleep_duration.write() = duration;
    }

    pub fn sleep_duration(&self) -> Duration {
        *self.sleep_duration.read()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
