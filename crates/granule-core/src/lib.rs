//! Core types for the granule particle substrate.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! identifiers that cross crate boundaries (stable slot ids, operation
//! stamps, arena instance ids) and the arena error type used by the
//! checked lookup paths.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;

pub use error::ArenaError;
pub use id::{ArenaInstanceId, SlotId, Stamp};
