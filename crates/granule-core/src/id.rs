//! Strongly-typed identifiers shared by the arena, grid, and engine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable handle to an object stored in an arena.
///
/// A `SlotId` stays meaningful while its object is live. Once the object
/// is erased the id is parked and handed out again by a later allocation,
/// so an id alone cannot tell two generations apart: pair it with a
/// [`Stamp`] (or use a weak reference) when staleness matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    /// The id as a `usize` table index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Operation stamp recorded on a slot each time it is reused or vacated.
///
/// Stamps come from a per-arena monotonic counter. A reference captured
/// with stamp `s` is valid exactly while the slot it names still carries
/// `s`; validity is a single integer comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stamp(pub u64);

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Stamp {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Counter for unique [`ArenaInstanceId`] allocation.
static ARENA_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for an arena.
///
/// Allocated from a monotonic atomic counter via [`ArenaInstanceId::next`].
/// References record the instance they were created from, so resolving a
/// reference against a different arena (even one of the same type, or a
/// new arena created after the old one was dropped) fails instead of
/// silently reading an unrelated object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaInstanceId(u64);

impl ArenaInstanceId {
    /// Allocate a fresh, unique instance ID. Thread-safe.
    pub fn next() -> Self {
        Self(ARENA_INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ArenaInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_are_unique() {
        let a = ArenaInstanceId::next();
        let b = ArenaInstanceId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn slot_id_index_and_display() {
        let id = SlotId::from(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(Stamp::from(3).to_string(), "3");
    }

    #[test]
    fn instance_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| (0..100).map(|_| ArenaInstanceId::next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<ArenaInstanceId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn slot_id_index_matches_raw(n in any::<u32>()) {
                prop_assert_eq!(SlotId::from(n).index(), n as usize);
            }

            #[test]
            fn display_parses_back(n in any::<u32>(), s in any::<u64>()) {
                prop_assert_eq!(SlotId::from(n).to_string().parse::<u32>().unwrap(), n);
                prop_assert_eq!(Stamp::from(s).to_string().parse::<u64>().unwrap(), s);
            }

            #[test]
            fn ordering_follows_raw_value(a in any::<u64>(), b in any::<u64>()) {
                prop_assert_eq!(Stamp(a).cmp(&Stamp(b)), a.cmp(&b));
            }
        }
    }
}
