//! Error types for pool construction.

use std::fmt;

/// Errors arising from [`ThreadPool`](crate::ThreadPool) construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A pool with zero workers was requested.
    ZeroThreads,
    /// The OS refused to spawn a worker thread.
    ThreadSpawnFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroThreads => write!(f, "thread pool needs at least one worker"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "failed to spawn worker thread: {reason}")
            }
        }
    }
}

impl std::error::Error for PoolError {}
