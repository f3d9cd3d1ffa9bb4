//! Running borrowing closures on the pool.
//!
//! Pool workers only accept `'static` tasks. `dispatch` needs to hand them
//! closures that borrow from the caller's stack frame, which is sound as
//! long as the frame cannot be left before those closures have finished.
//! [`run_scoped`] is the single place where that lifetime is erased; the
//! barrier that makes it sound is a drop guard, so it also holds when the
//! caller's own part of the work unwinds.

#![allow(unsafe_code)]

use crate::queue::{Task, TaskQueue};

/// A task that may borrow data living for `'env`.
pub(crate) type ScopedTask<'env> = Box<dyn FnOnce() + Send + 'env>;

/// Waits for the queue to go idle when dropped.
struct CompletionGuard<'q> {
    queue: &'q TaskQueue,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.queue.wait_idle();
    }
}

/// Queue every task in `tasks`, run `local` on the calling thread, then
/// block until the queue is idle.
///
/// Panics recorded by workers are re-raised after the barrier.
pub(crate) fn run_scoped<'env, I, L>(queue: &TaskQueue, tasks: I, local: L)
where
    I: IntoIterator<Item = ScopedTask<'env>>,
    L: FnOnce(),
{
    let guard = CompletionGuard { queue };
    for task in tasks {
        // SAFETY: `task` only differs from `Task` in its lifetime bound.
        // `guard` is dropped before this function returns or finishes
        // unwinding, and its drop blocks until the outstanding counter is
        // zero, which happens only once this task has run or been
        // discarded. Nothing the task borrows for `'env` can be invalidated
        // while the task is still alive.
        let task: Task = unsafe { std::mem::transmute::<ScopedTask<'env>, Task>(task) };
        queue.push(task);
    }
    local();
    drop(guard);
    queue.raise_panics();
}
