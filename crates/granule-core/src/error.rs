//! Error types for checked arena lookups.
//!
//! The hot-path APIs (`Arena` indexing, `WeakRef::get`) never produce these:
//! they either return `Option` or treat a bad id as a contract violation.
//! `ArenaError` exists for callers that want to report *why* a lookup
//! failed, e.g. in diagnostics or tests.

use std::error::Error;
use std::fmt;

use crate::id::{ArenaInstanceId, SlotId, Stamp};

/// Errors from checked arena and reference lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The id was never allocated by this arena, or names an erased object.
    UnknownSlot {
        /// The offending id.
        id: SlotId,
    },
    /// The slot has been vacated or reused since the reference was captured.
    StaleReference {
        /// The id the reference names.
        id: SlotId,
        /// The stamp captured by the reference.
        stamp: Stamp,
        /// The stamp currently recorded on the slot.
        current: Stamp,
    },
    /// The reference was created from a different arena instance.
    ArenaMismatch {
        /// Instance the reference was created from (`None` for a null reference).
        expected: Option<ArenaInstanceId>,
        /// Instance it was resolved against.
        found: ArenaInstanceId,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSlot { id } => write!(f, "unknown slot {id}"),
            Self::StaleReference { id, stamp, current } => {
                write!(
                    f,
                    "stale reference to slot {id}: captured stamp {stamp}, current {current}"
                )
            }
            Self::ArenaMismatch { expected, found } => match expected {
                Some(expected) => write!(
                    f,
                    "reference belongs to arena {expected}, resolved against arena {found}"
                ),
                None => write!(f, "null reference resolved against arena {found}"),
            },
        }
    }
}

impl Error for ArenaError {}
