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

//! Dispatch strategies for place callbacks. The strategy is resolved to a
//! trait object once, when the thread option is configured; the firing path
//! never branches on the mode.

use std::sync::Arc;
use std::thread;

use crate::job_queue::{Job, JobQueue};
use crate::properties::ActionsThreadOption;

pub(crate) trait ActionsExecutor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs the callback inline on the calling thread. Used for both the
/// `SingleThread` and `EventLoop` options; in the latter case the calling
/// thread is always the event loop.
pub(crate) struct SingleThreadExecutor;

impl ActionsExecutor for SingleThreadExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Hands the callback to the shared single-consumer queue; callbacks run in
/// enqueue order on the queue's worker thread.
pub(crate) struct JobQueueExecutor {
    queue: JobQueue,
}

impl JobQueueExecutor {
    pub fn new() -> Self {
        JobQueueExecutor {
            queue: JobQueue::new(),
        }
    }
}

impl ActionsExecutor for JobQueueExecutor {
    fn execute(&self, job: Job) {
        self.queue.add_job(job);
    }
}

/// Spawns a detached thread per callback; no ordering between callbacks and
/// their lifetime is independent of the event loop.
pub(crate) struct DetachedExecutor;

impl ActionsExecutor for DetachedExecutor {
    fn execute(&self, job: Job) {
        thread::spawn(job);
    }
}

/// Resolves a thread option to its executor. The enum is exhaustive, so the
/// original's "invalid configuration" failure cannot occur here; bad mode
/// strings are rejected earlier when parsing `ActionsThreadOption`.
pub(crate) fn executor_for(option: ActionsThreadOption) -> Arc<dyn ActionsExecutor> {
    match option {
        ActionsThreadOption::SingleThread | ActionsThreadOption::EventLoop => {
            Arc::new(SingleThreadExecutor)
        }
        ActionsThreadOption::JobQueue => Arc::new(JobQueueExecutor::new()),
        ActionsThreadOption::Detached => Arc::new(DetachedExecutor),
    }
}
