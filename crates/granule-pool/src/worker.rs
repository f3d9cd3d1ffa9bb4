//! A pool thread serving a shared [`TaskQueue`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_utils::Backoff;

use crate::config::WaitStrategy;
use crate::error::PoolError;
use crate::queue::TaskQueue;

/// How long a blocking worker parks before re-checking its stop flag.
const PARK_TIMEOUT: Duration = Duration::from_millis(5);

/// One OS thread looping over a shared queue until stopped.
///
/// Each iteration pops a task and runs it to completion. An empty queue
/// makes the worker back off (spin, then yield) or park, depending on the
/// queue's [`WaitStrategy`]. Stopping lets the current task finish; queued
/// tasks are left where they are.
pub struct Worker {
    index: usize,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn worker number `index` on `queue`.
    pub fn spawn(index: usize, queue: Arc<TaskQueue>) -> Result<Self, PoolError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let strategy = queue.strategy();
        let handle = thread::Builder::new()
            .name(format!("granule-worker-{index}"))
            .spawn(move || worker_loop(index, &queue, &flag))
            .map_err(|e| PoolError::ThreadSpawnFailed {
                reason: format!("worker {index}: {e}"),
            })?;
        tracing::debug!(worker = index, strategy = strategy.as_str(), "worker spawned");
        Ok(Self {
            index,
            running,
            handle: Some(handle),
        })
    }

    /// This worker's index within its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the worker has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the worker to exit after its current task. Does not wait.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Stop the worker and join its thread.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Join the thread. Only returns once [`request_stop`](Self::request_stop)
    /// has been called and the current task has finished.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(worker = self.index, "worker thread panicked");
            }
            tracing::debug!(worker = self.index, "worker stopped");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("index", &self.index)
            .field("running", &self.is_running())
            .finish()
    }
}

fn worker_loop(index: usize, queue: &TaskQueue, running: &AtomicBool) {
    let backoff = Backoff::new();
    while running.load(Ordering::Acquire) {
        let task = match queue.strategy() {
            WaitStrategy::Spin => queue.try_pop(),
            WaitStrategy::Block => queue.pop_timeout(PARK_TIMEOUT),
        };
        match task {
            Some(task) => {
                queue.execute(task, index);
                backoff.reset();
            }
            None if queue.strategy() == WaitStrategy::Spin => backoff.snooze(),
            None => {}
        }
    }
}
