//! Per-step orchestration for granule simulations.
//!
//! [`ParticleWorld`] owns the three building blocks, an [`Arena`] of
//! objects, a [`CollisionGrid`] over them, and a [`ThreadPool`], and runs
//! one step as a parallel grid rebuild followed by a parallel update.
//!
//! [`Arena`]: granule_arena::Arena
//! [`CollisionGrid`]: granule_space::CollisionGrid
//! [`ThreadPool`]: granule_pool::ThreadPool

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod world;

pub use config::{ConfigError, WorldConfig};
pub use granule_space::Positioned;
pub use metrics::{GridStats, StepMetrics};
pub use world::{NeighbourIds, ParticleWorld};

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ParticleWorld<[f32; 2]>>();
};
