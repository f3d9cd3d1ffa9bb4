//! Fixed-size worker pool for granule's per-step parallel work.
//!
//! A [`ThreadPool`] owns `N` [`Worker`] threads created once and kept for
//! the pool's lifetime. They all serve one [`TaskQueue`]: a mutex-guarded
//! FIFO plus an outstanding-task counter that drops only after a task has
//! finished running, which is what makes
//! [`wait_for_completion`](ThreadPool::wait_for_completion) a real barrier.
//!
//! [`ThreadPool::dispatch`] is the parallel-for: `[0, n)` is cut into one
//! contiguous batch per worker, the leftover tail runs on the calling
//! thread, and the call returns only after every piece has run. Closures
//! passed to `dispatch` may borrow from the caller.
//!
//! Idle waiting is selected by [`WaitStrategy`]: spin-then-yield for the
//! lowest latency in a tight simulation loop, or condition-variable
//! parking when idle CPU matters more.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pool;
pub mod queue;
mod scope;
pub mod worker;

pub use config::{PoolConfig, WaitStrategy, MAX_THREADS};
pub use error::PoolError;
pub use pool::ThreadPool;
pub use queue::{Task, TaskQueue};
pub use worker::Worker;
