//! Generational slot-map arena for granule simulations.
//!
//! Objects live in a packed dense array; a stable-id indirection layer
//! and a per-slot operation stamp give O(1) insert and erase with slot
//! reuse, plus checkable weak handles that survive compaction.
//!
//! # Architecture
//!
//! ```text
//! Arena<T>
//! ├── values:   Vec<T>          dense live prefix, compacted by swap-remove
//! ├── ids:      Vec<u32>        stable id → dense index
//! ├── metadata: Vec<SlotMeta>   dense index → (reverse id, stamp)
//! └── op_count: u64             monotonic stamp source
//!
//! WeakRef<T>      (id, arena instance, stamp)  typed handle into one arena
//! PolyRef<C>      (id, arena instance, stamp, accessor)
//!                 handle to "something implementing C" in any arena,
//!                 resolved through the type-erased SlotProvider trait
//! ```
//!
//! References never own and never cache an address: every dereference
//! goes back through the arena's current `ids` table, and validity is a
//! single stamp comparison.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod handle;
pub mod poly;
pub mod slot_map;

pub use config::ArenaConfig;
pub use granule_core::{ArenaError, ArenaInstanceId, SlotId, Stamp};
pub use handle::WeakRef;
pub use poly::{Capability, PolyRef, SlotProvider};
pub use slot_map::Arena;
