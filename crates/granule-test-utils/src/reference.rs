//! Reference model for differential arena tests.

use std::fmt::Debug;

use granule_core::SlotId;
use indexmap::IndexMap;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One step of a randomized arena workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArenaOp {
    /// Store this value.
    Allocate(u32),
    /// Erase the live id at this position (modulo the live count) of the
    /// model's insertion order. Ignored when nothing is live.
    Erase(usize),
    /// Erase the most recently erased id again.
    EraseAgain,
}

/// `len` reproducible operations, roughly 60% allocations.
pub fn random_ops(seed: u64, len: usize) -> Vec<ArenaOp> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| match rng.next_u32() % 10 {
            0..=5 => ArenaOp::Allocate(rng.next_u32()),
            6..=8 => ArenaOp::Erase(rng.next_u32() as usize),
            _ => ArenaOp::EraseAgain,
        })
        .collect()
}

/// What an arena should hold: live id to value.
///
/// Backed by an [`IndexMap`] so "the k-th live id" is well defined and
/// stable across runs.
#[derive(Clone, Debug)]
pub struct ReferenceModel<T> {
    live: IndexMap<SlotId, T>,
}

impl<T: Clone + Debug + PartialEq> ReferenceModel<T> {
    pub fn new() -> Self {
        Self {
            live: IndexMap::new(),
        }
    }

    /// Record `value` under `id`.
    ///
    /// # Panics
    ///
    /// If `id` is already live, which means the arena handed out a live id
    /// twice.
    pub fn insert(&mut self, id: SlotId, value: T) {
        if let Some(old) = self.live.insert(id, value) {
            panic!("id {id} allocated while still live (held {old:?})");
        }
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.live.swap_remove(&id)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.live.get(&id)
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// The live id at position `k % len`, if any.
    pub fn pick(&self, k: usize) -> Option<SlotId> {
        if self.live.is_empty() {
            None
        } else {
            self.live.get_index(k % self.live.len()).map(|(&id, _)| id)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> + '_ {
        self.live.iter().map(|(&id, v)| (id, v))
    }

    /// Panic unless `actual` yields exactly the model's `(id, value)` pairs,
    /// in any order.
    pub fn assert_matches<'a, I>(&self, actual: I)
    where
        I: IntoIterator<Item = (SlotId, &'a T)>,
        T: 'a,
    {
        let mut seen = 0usize;
        for (id, value) in actual {
            match self.live.get(&id) {
                Some(expected) => assert_eq!(expected, value, "value mismatch for id {id}"),
                None => panic!("id {id} is live in the arena but not in the model"),
            }
            seen += 1;
        }
        assert_eq!(seen, self.live.len(), "live count mismatch");
    }
}

impl<T: Clone + Debug + PartialEq> Default for ReferenceModel<T> {
    fn default() -> Self {
        Self::new()
    }
}
