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

//! Single-consumer FIFO job queue. Jobs are appended under a mutex and
//! drained in order by one worker thread that launches on demand and parks
//! itself when the queue runs dry.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::error;
use parking_lot::Mutex;

pub(crate) type Job = Box<dyn FnOnce() + Send>;

pub(crate) struct JobQueue {
    inner: Arc<QueueInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct QueueInner {
    jobs: Mutex<VecDeque<Job>>,
    // Worker currently draining the queue. Flipped under the jobs mutex so a
    // concurrent add_job never races the worker's shutdown decision.
    running: AtomicBool,
    active: AtomicBool,
    abort: AtomicBool,
}

impl JobQueue {
    pub fn new() -> Self {
        JobQueue {
            inner: Arc::new(QueueInner {
                jobs: Mutex::new(VecDeque::new()),
                running: AtomicBool::new(false),
                active: AtomicBool::new(true),
                abort: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Appends a job and makes sure a worker is draining the queue.
    pub fn add_job(&self, job: Job) {
        self.inner.jobs.lock().push_back(job);
        self.launch();
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Stops dispatching after the job currently running, keeping whatever
    /// is still queued.
    pub fn deactivate(&self) {
        if !self.inner.active.swap(false, Ordering::AcqRel) {
            return;
        }
        self.inner.abort.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("job queue worker thread panicked");
            }
        }
        self.inner.abort.store(false, Ordering::Release);
    }

    /// Resumes dispatch, immediately relaunching the worker if jobs
    /// accumulated while deactivated.
    pub fn activate(&self) {
        if self.inner.active.swap(true, Ordering::AcqRel) {
            return;
        }
        self.launch();
    }

    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.lock().len()
    }

    fn launch(&self) {
        let jobs = self.inner.jobs.lock();
        if self.inner.running.load(Ordering::Acquire)
            || jobs.is_empty()
            || !self.inner.active.load(Ordering::Acquire)
        {
            return;
        }
        self.inner.running.store(true, Ordering::Release);
        let inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || QueueInner::run(&inner));
        drop(jobs);

        // The previous worker, if any, has already drained and exited.
        let mut slot = self.worker.lock();
        if let Some(previous) = slot.take() {
            let _ = previous.join();
        }
        *slot = Some(handle);
    }
}

impl QueueInner {
    fn run(inner: &QueueInner) {
        let mut jobs = inner.jobs.lock();
        loop {
            if inner.abort.load(Ordering::Acquire) {
                break;
            }
            let Some(job) = jobs.pop_front() else {
                break;
            };
            drop(jobs);
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                error!("callback panicked inside the job queue; the net stays live");
            }
            jobs = inner.jobs.lock();
        }
        inner.running.store(false, Ordering::Release);
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.deactivate();
    }
}
