//! Pool configuration.

use crate::error::PoolError;

/// Upper bound on the number of workers.
pub const MAX_THREADS: usize = 64;

/// How idle workers and waiting callers pass the time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Spin, then yield the processor, and poll again. Lowest wake latency;
    /// idle workers keep their cores busy.
    #[default]
    Spin,
    /// Park on a condition variable until there is work or the last
    /// outstanding task finishes.
    Block,
}

impl WaitStrategy {
    /// Short lowercase name, used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spin => "spin",
            Self::Block => "block",
        }
    }
}

/// Configuration for [`ThreadPool`](crate::ThreadPool).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of workers. `None` = one per available core. Default: `None`.
    pub thread_count: Option<usize>,
    /// Idle behaviour of workers and of completion waits. Default: `Spin`.
    pub wait: WaitStrategy,
}

impl PoolConfig {
    /// Config with an explicit worker count.
    pub fn with_threads(thread_count: usize) -> Self {
        Self {
            thread_count: Some(thread_count),
            ..Self::default()
        }
    }

    /// Resolve the actual worker count.
    ///
    /// An explicit count of zero is rejected. Explicit counts above
    /// [`MAX_THREADS`] are clamped; auto-detection is clamped to
    /// `[1, MAX_THREADS]`.
    pub fn resolved_thread_count(&self) -> Result<usize, PoolError> {
        match self.thread_count {
            Some(0) => Err(PoolError::ZeroThreads),
            Some(n) => Ok(n.min(MAX_THREADS)),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                Ok(cpus.clamp(1, MAX_THREADS))
            }
        }
    }
}
