//! Test fixtures and reference models for granule development.
//!
//! - [`Particle`]: a minimal positioned object for grid, pool and engine
//!   tests, plus seeded spawners that lay particles out deterministically.
//! - [`ReferenceModel`]: an insertion-ordered map that mirrors what an arena
//!   should contain, for differential tests.
//! - [`random_ops`]: reproducible allocate/erase sequences.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod reference;

pub use fixtures::{spawn_clustered, spawn_uniform, Particle};
pub use reference::{random_ops, ArenaOp, ReferenceModel};
