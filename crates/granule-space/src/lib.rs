//! Spatial hash grid for granule broad-phase queries.
//!
//! The world is covered by a uniform grid of one-unit cells. Every step the
//! grid is cleared and repopulated from current object positions; collision
//! and interaction passes then look only at the 3x3 block of cells around
//! each object.
//!
//! # Layout
//!
//! - [`CollisionCell`]: inline bucket of at most `N` object ids (default 4).
//!   A full bucket drops further inserts.
//! - [`CollisionGrid`]: flat `Vec` of cells indexed `x * height + y`, with an
//!   overflow tally that makes dropped inserts observable.
//! - [`GridStripe`]: exclusive view of a range of columns, for filling the
//!   grid from several threads without sharing any cell.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod config;
pub mod error;
pub mod grid;
pub mod position;

pub use cell::CollisionCell;
pub use config::GridConfig;
pub use error::SpaceError;
pub use grid::{CollisionGrid, GridStripe, Neighbours};
pub use position::Positioned;
