//! Granule: building blocks for parallel particle simulations.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! granule sub-crates. For most users, adding `granule` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use granule::prelude::*;
//!
//! #[derive(Clone, Copy)]
//! struct Dot {
//!     pos: [f32; 2],
//!     vel: [f32; 2],
//! }
//!
//! impl Positioned for Dot {
//!     fn position(&self) -> [f32; 2] {
//!         self.pos
//!     }
//! }
//!
//! let config = WorldConfig {
//!     pool: PoolConfig::with_threads(2),
//!     ..WorldConfig::new(16, 16)
//! };
//! let mut world = ParticleWorld::new(config).unwrap();
//! let a = world.spawn(Dot { pos: [4.5, 4.5], vel: [1.0, 0.0] });
//! let b = world.spawn(Dot { pos: [5.5, 4.5], vel: [0.0, 0.0] });
//! let handle = world.weak_ref(b).unwrap();
//!
//! let metrics = world.step(|d| {
//!     d.pos[0] += d.vel[0];
//!     d.pos[1] += d.vel[1];
//! });
//! assert_eq!(metrics.grid_inserted, 2);
//! assert_eq!(world.neighbours_of(a).as_slice(), &[b]);
//!
//! world.despawn(b);
//! assert!(!handle.is_valid(world.arena()));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `granule-core` | Slot ids, stamps, arena errors |
//! | [`arena`] | `granule-arena` | Generational slot map, weak and polymorphic refs |
//! | [`space`] | `granule-space` | Bucketed collision grid |
//! | [`pool`] | `granule-pool` | Thread pool, task queue, workers |
//! | [`engine`] | `granule-engine` | Per-step orchestration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Ids, stamps, and arena errors (`granule-core`).
pub use granule_core as types;

/// Generational slot map storage (`granule-arena`).
///
/// [`arena::Arena`] stores values densely and hands out stable
/// [`types::SlotId`]s. [`arena::WeakRef`] and [`arena::PolyRef`] detect
/// erased targets through the slot's stamp.
pub use granule_arena as arena;

/// Spatial hashing (`granule-space`).
///
/// [`space::CollisionGrid`] buckets object ids into fixed-capacity cells and
/// can be split into [`space::GridStripe`]s for parallel rebuilds.
pub use granule_space as space;

/// Worker pool (`granule-pool`).
///
/// [`pool::ThreadPool::dispatch`] splits an index range across workers and
/// blocks until every part has run.
pub use granule_pool as pool;

/// Per-step orchestration (`granule-engine`).
pub use granule_engine as engine;

/// Common imports for typical granule usage.
///
/// ```rust
/// use granule::prelude::*;
/// ```
pub mod prelude {
    // Ids and errors
    pub use granule_core::{ArenaError, SlotId, Stamp};

    // Storage
    pub use granule_arena::{Arena, ArenaConfig, Capability, PolyRef, SlotProvider, WeakRef};

    // Space
    pub use granule_space::{CollisionGrid, GridConfig, Positioned, SpaceError};

    // Pool
    pub use granule_pool::{PoolConfig, PoolError, ThreadPool, WaitStrategy};

    // Engine
    pub use granule_engine::{ConfigError, ParticleWorld, StepMetrics, WorldConfig};
}
