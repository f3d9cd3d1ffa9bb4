//! Shared FIFO of pending tasks with an outstanding-task counter.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_utils::{Backoff, CachePadded};

use crate::config::WaitStrategy;

/// A unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// FIFO of [`Task`]s shared by every worker of a pool.
///
/// The outstanding counter is incremented when a task is added and
/// decremented only after the task has *finished running*, so
/// [`wait_for_completion`](Self::wait_for_completion) returning means every
/// task added before the call has executed, not merely been dequeued.
///
/// The mutex guards only the deque; tasks run outside it.
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    remaining: CachePadded<AtomicUsize>,
    panicked: AtomicUsize,
    strategy: WaitStrategy,
    /// Signalled on push, paired with `tasks`. Block strategy only.
    available: Condvar,
    idle_lock: Mutex<()>,
    /// Signalled when `remaining` drops to zero. Block strategy only.
    idle: Condvar,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new(strategy: WaitStrategy) -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            remaining: CachePadded::new(AtomicUsize::new(0)),
            panicked: AtomicUsize::new(0),
            strategy,
            available: Condvar::new(),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
        }
    }

    /// The wait strategy workers and waiters use.
    pub fn strategy(&self) -> WaitStrategy {
        self.strategy
    }

    /// Enqueue a closure.
    pub fn add_task<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(f));
    }

    /// Enqueue a boxed task.
    pub fn push(&self, task: Task) {
        // Counted before it becomes visible to workers, so the counter can
        // never read zero while the task is queued.
        self.remaining.fetch_add(1, Ordering::AcqRel);
        self.lock_tasks().push_back(task);
        if self.strategy == WaitStrategy::Block {
            self.available.notify_one();
        }
    }

    /// Dequeue the oldest task without waiting.
    pub fn try_pop(&self) -> Option<Task> {
        self.lock_tasks().pop_front()
    }

    /// Dequeue the oldest task, parking up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Task> {
        let mut tasks = self.lock_tasks();
        if tasks.is_empty() {
            tasks = self
                .available
                .wait_timeout_while(tasks, timeout, |t| t.is_empty())
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        tasks.pop_front()
    }

    /// Run `task` on the calling thread and mark it finished.
    ///
    /// A panic inside the task is caught, logged and recorded; the next
    /// [`wait_for_completion`](Self::wait_for_completion) re-raises it.
    pub fn execute(&self, task: Task, worker: usize) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            self.panicked.fetch_add(1, Ordering::AcqRel);
            tracing::error!(worker, payload = panic_message(&*payload), "task panicked");
        }
        self.finish_one();
    }

    /// Tasks added and not yet finished (queued or running).
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Tasks queued and not yet picked up.
    pub fn len(&self) -> usize {
        self.lock_tasks().len()
    }

    /// Whether no task is queued. Tasks may still be running.
    pub fn is_empty(&self) -> bool {
        self.lock_tasks().is_empty()
    }

    /// Block until every added task has finished running.
    ///
    /// # Panics
    ///
    /// Panics if any task panicked since the previous wait.
    pub fn wait_for_completion(&self) {
        self.wait_idle();
        self.raise_panics();
    }

    /// Block until the outstanding counter reaches zero.
    pub(crate) fn wait_idle(&self) {
        match self.strategy {
            WaitStrategy::Spin => {
                let backoff = Backoff::new();
                while self.remaining() != 0 {
                    backoff.snooze();
                }
            }
            WaitStrategy::Block => {
                let guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
                let _guard = self
                    .idle
                    .wait_while(guard, |_| self.remaining() != 0)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    /// Re-raise task panics recorded since the last call.
    pub(crate) fn raise_panics(&self) {
        let count = self.panicked.swap(0, Ordering::AcqRel);
        if count > 0 {
            panic!("{count} pool task(s) panicked");
        }
    }

    /// Discard every queued task. Returns how many were dropped.
    pub(crate) fn abandon(&self) -> usize {
        let dropped: Vec<Task> = self.lock_tasks().drain(..).collect();
        let count = dropped.len();
        for _ in 0..count {
            self.finish_one();
        }
        count
    }

    /// Wake every worker parked in [`pop_timeout`](Self::pop_timeout).
    pub(crate) fn wake_all(&self) {
        self.available.notify_all();
    }

    fn finish_one(&self) {
        let before = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if before == 1 && self.strategy == WaitStrategy::Block {
            // Taking the lock orders this notify after a waiter's check.
            let _guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.idle.notify_all();
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("queued", &self.len())
            .field("remaining", &self.remaining())
            .field("strategy", &self.strategy)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn fifo_order() {
        let queue = TaskQueue::new(WaitStrategy::Spin);
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            queue.add_task(move || log.lock().unwrap().push(i));
        }
        assert_eq!(queue.len(), 3);
        while let Some(task) = queue.try_pop() {
            queue.execute(task, 0);
        }
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn counter_drops_after_execution_not_dequeue() {
        let queue = TaskQueue::new(WaitStrategy::Spin);
        queue.add_task(|| {});
        let task = queue.try_pop().unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.remaining(), 1);
        queue.execute(task, 0);
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn panicking_task_still_completes() {
        let queue = TaskQueue::new(WaitStrategy::Spin);
        queue.add_task(|| panic!("boom"));
        let task = queue.try_pop().unwrap();
        queue.execute(task, 0);
        assert_eq!(queue.remaining(), 0);
        let raised = panic::catch_unwind(AssertUnwindSafe(|| queue.wait_for_completion()));
        assert!(raised.is_err());
        // Reported once.
        queue.wait_for_completion();
    }

    #[test]
    fn abandon_drops_queued_tasks() {
        let queue = TaskQueue::new(WaitStrategy::Spin);
        let ran = Arc::new(AtomicBool::new(false));
        for _ in 0..4 {
            let ran = Arc::clone(&ran);
            queue.add_task(move || ran.store(true, Ordering::SeqCst));
        }
        assert_eq!(queue.abandon(), 4);
        assert_eq!(queue.remaining(), 0);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn pop_timeout_returns_none_when_empty() {
        let queue = TaskQueue::new(WaitStrategy::Block);
        assert!(queue.pop_timeout(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn block_wait_wakes_on_completion() {
        let queue = Arc::new(TaskQueue::new(WaitStrategy::Block));
        let done = Arc::new(AtomicBool::new(false));
        {
            let done = Arc::clone(&done);
            queue.add_task(move || {
                std::thread::sleep(Duration::from_millis(10));
                done.store(true, Ordering::SeqCst);
            });
        }
        let runner = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let task = queue.pop_timeout(Duration::from_secs(5)).unwrap();
                queue.execute(task, 0);
            })
        };
        queue.wait_for_completion();
        assert!(done.load(Ordering::SeqCst));
        runner.join().unwrap();
    }

    #[test]
    fn panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*s), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*owned), "owned");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*other), "<non-string panic payload>");
    }
}
