//! Fixed-size worker pool with parallel-for dispatch.

use std::sync::Arc;

use crate::config::{PoolConfig, WaitStrategy};
use crate::error::PoolError;
use crate::queue::TaskQueue;
use crate::scope::{run_scoped, ScopedTask};
use crate::worker::Worker;

/// `N` persistent workers sharing one [`TaskQueue`].
///
/// The worker count is fixed at construction. Dropping the pool stops and
/// joins every worker; tasks still queued at that point are discarded
/// without running.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use granule_pool::ThreadPool;
///
/// let pool = ThreadPool::with_threads(4).unwrap();
/// let sum = AtomicUsize::new(0);
/// pool.dispatch(100, |start, end| {
///     sum.fetch_add((start..end).sum::<usize>(), Ordering::Relaxed);
/// });
/// assert_eq!(sum.load(Ordering::Relaxed), 4950);
/// ```
pub struct ThreadPool {
    queue: Arc<TaskQueue>,
    workers: Vec<Worker>,
}

impl ThreadPool {
    /// Start a pool as described by `config`.
    pub fn new(config: &PoolConfig) -> Result<Self, PoolError> {
        let threads = config.resolved_thread_count()?;
        let queue = Arc::new(TaskQueue::new(config.wait));
        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            // Already-spawned workers are stopped by their Drop on error.
            workers.push(Worker::spawn(index, Arc::clone(&queue))?);
        }
        tracing::info!(threads, strategy = config.wait.as_str(), "thread pool started");
        Ok(Self { queue, workers })
    }

    /// Start a spinning pool with `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, PoolError> {
        Self::new(&PoolConfig::with_threads(threads))
    }

    /// Number of workers.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// The pool's wait strategy.
    pub fn wait_strategy(&self) -> WaitStrategy {
        self.queue.strategy()
    }

    /// Tasks added and not yet finished.
    pub fn pending(&self) -> usize {
        self.queue.remaining()
    }

    /// Enqueue a unit of work.
    pub fn add_task<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.add_task(f);
    }

    /// Block until every task added so far has finished running.
    ///
    /// # Panics
    ///
    /// Re-raises, on the calling thread, any panic from a task that ran
    /// since the previous wait.
    pub fn wait_for_completion(&self) {
        self.queue.wait_for_completion();
    }

    /// Run `f(start, end)` over `[0, n)` split into contiguous ranges.
    ///
    /// Each worker gets one batch of `n / threads` indices. The remaining
    /// `n % threads` indices at the end are handled by the calling thread
    /// after the batches are queued. Returns once every range, queued or
    /// local, has been processed. One batch per worker is always queued, so
    /// when `n < threads` every batch is the empty range `(0, 0)` and the
    /// caller processes all of `[0, n)` itself.
    ///
    /// Ranges run in no particular order relative to each other. `f` must
    /// not call back into this pool's waits from a worker.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from any batch once all batches have finished.
    pub fn dispatch<F>(&self, n: usize, f: F)
    where
        F: Fn(usize, usize) + Sync,
    {
        let threads = self.thread_count();
        let batch = n / threads;
        let split = batch * threads;
        let f = &f;
        let tasks = (0..threads).map(|i| {
            let start = i * batch;
            Box::new(move || f(start, start + batch)) as ScopedTask<'_>
        });
        run_scoped(&self.queue, tasks, || {
            if split < n {
                f(split, n);
            }
        });
    }

    /// Run `f(offset, chunk)` over disjoint mutable chunks of `data`.
    ///
    /// Uses the same split as [`dispatch`](Self::dispatch): one chunk of
    /// `len / threads` elements per worker, and the tail handled by the
    /// calling thread. `offset` is the chunk's start index within `data`.
    /// Empty chunks are never handed out, so when `len < threads` nothing
    /// is queued.
    pub fn dispatch_slice_mut<T, F>(&self, data: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let threads = self.thread_count();
        let batch = data.len() / threads;
        let queued = if batch == 0 { 0 } else { threads };
        let (head, tail) = data.split_at_mut(batch * queued);
        let split = head.len();
        let f = &f;
        let tasks = head.chunks_mut(batch.max(1)).enumerate().map(|(i, chunk)| {
            Box::new(move || f(i * batch, chunk)) as ScopedTask<'_>
        });
        run_scoped(&self.queue, tasks, || {
            if !tail.is_empty() {
                f(split, tail);
            }
        });
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.request_stop();
        }
        self.queue.wake_all();
        for worker in &mut self.workers {
            worker.join();
        }
        let abandoned = self.queue.abandon();
        tracing::info!(threads = self.workers.len(), abandoned, "thread pool stopped");
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("threads", &self.workers.len())
            .field("queue", &self.queue)
            .finish()
    }
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ThreadPool>();
};
