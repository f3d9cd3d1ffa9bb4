//! World configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use granule_arena::ArenaConfig;
use granule_pool::{PoolConfig, PoolError};
use granule_space::{GridConfig, SpaceError};

// ── WorldConfig ────────────────────────────────────────────────

/// Everything needed to build a [`ParticleWorld`](crate::ParticleWorld).
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig {
    /// World width in units, which is also the grid width in cells.
    /// Default: 64.
    pub width: u32,
    /// World height in units and grid cells. Default: 64.
    pub height: u32,
    /// Objects closer than this to any border are left out of the grid.
    /// Default: 1.0.
    pub margin: f32,
    /// Worker pool settings.
    pub pool: PoolConfig,
    /// Object storage settings.
    pub arena: ArenaConfig,
}

impl WorldConfig {
    /// Config for a `width` x `height` world with default everything else.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// The grid this world will use.
    pub fn grid(&self) -> GridConfig {
        GridConfig::new(self.width, self.height)
    }

    /// Check all structural invariants without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid().validate()?;
        let half = self.width.min(self.height) as f32 / 2.0;
        if !self.margin.is_finite() || self.margin < 0.0 || self.margin >= half {
            return Err(ConfigError::InvalidMargin { value: self.margin });
        }
        self.pool.resolved_thread_count()?;
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            margin: 1.0,
            pool: PoolConfig::default(),
            arena: ArenaConfig::default(),
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────

/// Errors detected while validating a [`WorldConfig`] or building a world.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Grid dimensions are invalid.
    Space(SpaceError),
    /// The worker pool could not be configured or started.
    Pool(PoolError),
    /// `margin` is negative, non-finite, or leaves no interior.
    InvalidMargin {
        /// The rejected value.
        value: f32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space(e) => write!(f, "grid: {e}"),
            Self::Pool(e) => write!(f, "pool: {e}"),
            Self::InvalidMargin { value } => {
                write!(f, "border margin {value} must be finite, >= 0 and leave an interior")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Space(e) => Some(e),
            Self::Pool(e) => Some(e),
            Self::InvalidMargin { .. } => None,
        }
    }
}

impl From<SpaceError> for ConfigError {
    fn from(e: SpaceError) -> Self {
        Self::Space(e)
    }
}

impl From<PoolError> for ConfigError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}
