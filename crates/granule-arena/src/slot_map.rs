//! Packed slot-map storage with stable ids and operation stamps.
//!
//! [`Arena`] keeps every live object in the dense prefix of a `Vec<T>`.
//! Stable ids index an indirection table (`ids`) that is kept in sync as
//! erasure swap-removes objects, and each dense position carries the
//! reverse id plus an operation stamp. Slots beyond the live prefix are
//! parked: their reverse id is handed out again by the next allocation,
//! and their stamp is bumped so that references captured against the old
//! occupant compare unequal.

use std::fmt;
use std::ops::{Index, IndexMut};

use granule_core::{ArenaError, ArenaInstanceId, SlotId, Stamp};

use crate::config::ArenaConfig;
use crate::handle::WeakRef;
use crate::poly::{Capability, PolyRef};

/// Per-dense-position bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SlotMeta {
    /// Stable id currently mapped to this dense position.
    reverse_id: SlotId,
    /// Stamp recorded at the last reuse or vacate of this position.
    stamp: Stamp,
}

/// Result of reserving a slot for a new object.
#[derive(Clone, Copy, Debug)]
struct Slot {
    id: SlotId,
    dense: usize,
}

/// Generational slot-map arena.
///
/// - `allocate` is O(1): it either appends a brand-new slot (when every
///   slot is live) or reuses the parked slot sitting just past the live
///   range.
/// - `erase` is O(1): the erased object is swap-removed, the two affected
///   stable ids are re-pointed, and the vacated slot gets a fresh stamp.
/// - Erasing an id twice is a no-op.
///
/// Stable ids are recycled, so an id alone does not identify a
/// generation. Use [`WeakRef`] (or [`stamp`](Arena::stamp) plus
/// [`is_valid`](Arena::is_valid)) to detect staleness.
///
/// The arena is not internally synchronized. Concurrent work over it is
/// done by splitting [`as_mut_slice`](Arena::as_mut_slice) into disjoint
/// ranges, while allocation and erasure stay on one thread.
pub struct Arena<T> {
    values: Vec<T>,
    ids: Vec<u32>,
    metadata: Vec<SlotMeta>,
    op_count: u64,
    instance_id: ArenaInstanceId,
}

impl<T> Arena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty arena with room for `capacity` objects.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            ids: Vec::with_capacity(capacity),
            metadata: Vec::with_capacity(capacity),
            op_count: 0,
            instance_id: ArenaInstanceId::next(),
        }
    }

    /// Create an arena from a config.
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self::with_capacity(config.initial_capacity)
    }

    /// Unique id of this arena instance.
    pub fn instance_id(&self) -> ArenaInstanceId {
        self.instance_id
    }

    /// Store `value` and return its stable id.
    pub fn allocate(&mut self, value: T) -> SlotId {
        let slot = self.acquire_slot();
        debug_assert_eq!(slot.dense, self.values.len());
        self.values.push(value);
        slot.id
    }

    /// Store a clone of `value` and return its stable id.
    pub fn allocate_copy(&mut self, value: &T) -> SlotId
    where
        T: Clone,
    {
        self.allocate(value.clone())
    }

    /// The id the next [`allocate`](Arena::allocate) call will return.
    pub fn next_id(&self) -> SlotId {
        let len = self.values.len();
        if self.is_full() {
            SlotId(len as u32)
        } else {
            self.metadata[len].reverse_id
        }
    }

    /// Erase the object named by `id`, returning it.
    ///
    /// Returns `None` without touching anything if `id` is not live
    /// (already erased, or never allocated).
    pub fn erase(&mut self, id: SlotId) -> Option<T> {
        let dense = *self.ids.get(id.index())? as usize;
        if dense >= self.values.len() {
            return None;
        }
        let value = self.values.swap_remove(dense);
        let last = self.values.len();
        let last_id = self.metadata[last].reverse_id;
        self.metadata.swap(last, dense);
        self.ids.swap(last_id.index(), id.index());
        self.metadata[last].stamp = self.bump();
        Some(value)
    }

    /// Erase every object for which `keep` returns `false`.
    ///
    /// Runs in place: the object swapped into a vacated position is
    /// examined before moving on.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        let mut dense = 0;
        while dense < self.values.len() {
            if keep(&self.values[dense]) {
                dense += 1;
            } else {
                let id = self.metadata[dense].reverse_id;
                self.erase(id);
            }
        }
    }

    /// Remove every object. Backing capacity and the stamp counter are kept,
    /// so references captured before the clear stay invalid afterwards.
    pub fn clear(&mut self) {
        self.values.clear();
        self.ids.clear();
        self.metadata.clear();
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no live objects.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of slots (live plus parked) in the slot tables.
    ///
    /// This only grows when an allocation finds every slot live.
    pub fn slot_count(&self) -> usize {
        self.metadata.len()
    }

    /// Whether `id` currently names a live object.
    pub fn contains(&self, id: SlotId) -> bool {
        self.dense_index(id).is_some()
    }

    /// Borrow the object named by `id`, if it is live.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        let dense = self.dense_index(id)?;
        Some(&self.values[dense])
    }

    /// Mutably borrow the object named by `id`, if it is live.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        let dense = self.dense_index(id)?;
        Some(&mut self.values[dense])
    }

    /// Like [`get`](Arena::get), but reports why the lookup failed.
    pub fn try_get(&self, id: SlotId) -> Result<&T, ArenaError> {
        self.get(id).ok_or(ArenaError::UnknownSlot { id })
    }

    /// Stamp currently recorded on the slot named by `id`.
    ///
    /// Returns `None` only for ids this arena never handed out. A parked
    /// (erased) id still has a stamp; it just differs from any stamp
    /// captured while the object was live.
    pub fn stamp(&self, id: SlotId) -> Option<Stamp> {
        let &dense = self.ids.get(id.index())?;
        Some(self.metadata[dense as usize].stamp)
    }

    /// Whether the slot named by `id` still carries `stamp`.
    pub fn is_valid(&self, id: SlotId, stamp: Stamp) -> bool {
        self.stamp(id) == Some(stamp)
    }

    /// Capture a weak reference to the live object named by `id`.
    pub fn weak_ref(&self, id: SlotId) -> Option<WeakRef<T>> {
        let dense = self.dense_index(id)?;
        Some(WeakRef::new(
            id,
            self.instance_id,
            self.metadata[dense].stamp,
        ))
    }

    /// Capture a polymorphic reference to the live object named by `id`,
    /// viewed through capability `C`.
    pub fn poly_ref<C>(&self, id: SlotId) -> Option<PolyRef<C>>
    where
        C: ?Sized + 'static,
        T: Capability<C> + 'static,
    {
        let dense = self.dense_index(id)?;
        Some(PolyRef::bind::<T>(
            id,
            self.instance_id,
            self.metadata[dense].stamp,
        ))
    }

    /// Visit every object that is live when the call starts.
    ///
    /// The callback gets the arena itself, so it may allocate; objects
    /// allocated during the pass are not visited by it. The live count is
    /// re-checked before each visit, so erasing from the callback ends the
    /// pass early rather than reading past the live range, but the swap
    /// that erasure performs means some objects may then be skipped.
    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Self, SlotId),
    {
        let snapshot = self.values.len();
        for dense in 0..snapshot {
            if dense >= self.values.len() {
                break;
            }
            let id = self.metadata[dense].reverse_id;
            f(self, id);
        }
    }

    /// Stable id of the object at dense position `dense`.
    pub fn id_at(&self, dense: usize) -> Option<SlotId> {
        if dense < self.values.len() {
            Some(self.metadata[dense].reverse_id)
        } else {
            None
        }
    }

    /// `(stable id, object)` at dense position `dense`.
    pub fn slot_at(&self, dense: usize) -> Option<(SlotId, &T)> {
        let value = self.values.get(dense)?;
        Some((self.metadata[dense].reverse_id, value))
    }

    /// The dense live objects, in storage order.
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// The dense live objects, mutably, in storage order.
    ///
    /// Storage order changes on erase; do not hold dense indices across
    /// an erase.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterate over live objects in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// Iterate mutably over live objects in storage order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.values.iter_mut()
    }

    /// Iterate over `(stable id, object)` pairs in storage order.
    pub fn iter_slots(&self) -> impl Iterator<Item = (SlotId, &T)> + '_ {
        self.metadata
            .iter()
            .zip(self.values.iter())
            .map(|(meta, value)| (meta.reverse_id, value))
    }

    /// Iterate mutably over `(stable id, object)` pairs in storage order.
    pub fn iter_slots_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> + '_ {
        self.metadata
            .iter()
            .zip(self.values.iter_mut())
            .map(|(meta, value)| (meta.reverse_id, value))
    }

    fn is_full(&self) -> bool {
        self.values.len() == self.metadata.len()
    }

    fn dense_index(&self, id: SlotId) -> Option<usize> {
        let dense = *self.ids.get(id.index())? as usize;
        (dense < self.values.len()).then_some(dense)
    }

    fn bump(&mut self) -> Stamp {
        self.op_count += 1;
        Stamp(self.op_count)
    }

    fn acquire_slot(&mut self) -> Slot {
        let dense = self.values.len();
        if self.is_full() {
            assert!(
                dense < u32::MAX as usize,
                "arena slot table exhausted ({dense} slots)"
            );
            let id = SlotId(dense as u32);
            let stamp = self.bump();
            self.ids.push(dense as u32);
            self.metadata.push(SlotMeta {
                reverse_id: id,
                stamp,
            });
            Slot { id, dense }
        } else {
            let stamp = self.bump();
            let meta = &mut self.metadata[dense];
            meta.stamp = stamp;
            Slot {
                id: meta.reverse_id,
                dense,
            }
        }
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning yields an independent arena with a fresh instance id:
/// references into the source arena do not resolve against the clone.
impl<T: Clone> Clone for Arena<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            ids: self.ids.clone(),
            metadata: self.metadata.clone(),
            op_count: self.op_count,
            instance_id: ArenaInstanceId::next(),
        }
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("instance_id", &self.instance_id)
            .field("len", &self.values.len())
            .field("slot_count", &self.metadata.len())
            .field("op_count", &self.op_count)
            .finish()
    }
}

/// Index by stable id.
///
/// # Panics
///
/// Panics if `id` was never handed out by this arena, or names a parked
/// slot. An erased id whose slot has since been reused resolves to the new
/// occupant: check reference validity before indexing.
impl<T> Index<SlotId> for Arena<T> {
    type Output = T;

    fn index(&self, id: SlotId) -> &T {
        &self.values[self.ids[id.index()] as usize]
    }
}

impl<T> IndexMut<SlotId> for Arena<T> {
    fn index_mut(&mut self, id: SlotId) -> &mut T {
        &mut self.values[self.ids[id.index()] as usize]
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Arena<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Check the id/metadata bijection over the whole slot table.
    fn assert_consistent<T>(arena: &Arena<T>) {
        assert_eq!(arena.ids.len(), arena.metadata.len());
        assert!(arena.values.len() <= arena.metadata.len());
        for (dense, meta) in arena.metadata.iter().enumerate() {
            assert_eq!(arena.ids[meta.reverse_id.index()] as usize, dense);
        }
    }

    #[test]
    fn allocate_returns_sequential_ids_when_fresh() {
        let mut arena = Arena::new();
        let a = arena.allocate("a");
        let b = arena.allocate("b");
        let c = arena.allocate("c");
        assert_eq!((a, b, c), (SlotId(0), SlotId(1), SlotId(2)));
        assert_eq!(arena.len(), 3);
        assert_eq!(arena[b], "b");
        assert_consistent(&arena);
    }

    #[test]
    fn erase_compacts_and_keeps_other_ids() {
        let mut arena = Arena::new();
        let ids: Vec<_> = (0..5).map(|i| arena.allocate(i * 10)).collect();

        assert_eq!(arena.erase(ids[1]), Some(10));
        assert_eq!(arena.len(), 4);
        for (i, &id) in ids.iter().enumerate() {
            if i == 1 {
                assert!(arena.get(id).is_none());
            } else {
                assert_eq!(arena[id], i * 10);
            }
        }
        // Last object was swapped into the vacated position.
        assert_eq!(arena.as_slice(), &[0, 40, 20, 30]);
        assert_consistent(&arena);
    }

    #[test]
    fn double_erase_is_noop() {
        let mut arena = Arena::new();
        let a = arena.allocate(1);
        let b = arena.allocate(2);
        assert_eq!(arena.erase(a), Some(1));
        let stamp_b = arena.stamp(b).unwrap();
        assert_eq!(arena.erase(a), None);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena[b], 2);
        assert_eq!(arena.stamp(b), Some(stamp_b));
        assert_consistent(&arena);
    }

    #[test]
    fn erase_unknown_id_is_noop() {
        let mut arena: Arena<u8> = Arena::new();
        assert_eq!(arena.erase(SlotId(99)), None);
        arena.allocate(1);
        assert_eq!(arena.erase(SlotId(99)), None);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn erased_id_is_reused_with_new_stamp() {
        let mut arena = Arena::new();
        let a = arena.allocate('a');
        let _b = arena.allocate('b');
        let old = arena.stamp(a).unwrap();
        arena.erase(a);
        let vacated = arena.stamp(a).unwrap();
        assert!(vacated > old);

        assert_eq!(arena.next_id(), a);
        let again = arena.allocate('z');
        assert_eq!(again, a);
        let reused = arena.stamp(a).unwrap();
        assert!(reused > vacated);
        assert!(!arena.is_valid(a, old));
        assert!(arena.is_valid(a, reused));
        assert_eq!(arena[a], 'z');
        assert_eq!(arena.slot_count(), 2);
    }

    #[test]
    fn next_id_when_full_is_slot_count() {
        let mut arena = Arena::new();
        assert_eq!(arena.next_id(), SlotId(0));
        arena.allocate(());
        arena.allocate(());
        assert_eq!(arena.next_id(), SlotId(2));
    }

    #[test]
    fn reuse_is_lifo_over_parked_slots() {
        let mut arena = Arena::new();
        let ids: Vec<_> = (0..4).map(|i| arena.allocate(i)).collect();
        arena.erase(ids[0]);
        arena.erase(ids[2]);
        assert_eq!(arena.allocate(100), ids[2]);
        assert_eq!(arena.allocate(200), ids[0]);
        assert_eq!(arena.slot_count(), 4);
        assert_consistent(&arena);
    }

    #[test]
    fn erase_all_then_reallocate_does_not_grow() {
        let mut arena = Arena::new();
        let ids: Vec<_> = (0..64).map(|i| arena.allocate(i)).collect();
        let slots = arena.slot_count();
        for &id in &ids {
            arena.erase(id);
        }
        assert!(arena.is_empty());
        for i in 0..64 {
            arena.allocate(i);
        }
        assert_eq!(arena.len(), 64);
        assert_eq!(arena.slot_count(), slots);
        assert_consistent(&arena);
    }

    #[test]
    fn every_stamp_is_unique() {
        let mut arena = Arena::new();
        let mut seen = std::collections::HashSet::new();
        for round in 0..10 {
            let id = arena.allocate(round);
            assert!(seen.insert(arena.stamp(id).unwrap()));
            if round % 2 == 0 {
                arena.erase(id);
                assert!(seen.insert(arena.stamp(id).unwrap()));
            }
        }
    }

    #[test]
    fn clear_keeps_capacity_and_invalidates_stamps() {
        let mut arena = Arena::with_capacity(16);
        let a = arena.allocate(1u32);
        let stamp = arena.stamp(a).unwrap();
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.slot_count(), 0);
        assert!(arena.values.capacity() >= 16);
        assert!(!arena.is_valid(a, stamp));

        let again = arena.allocate(2);
        assert_eq!(again, a);
        assert!(!arena.is_valid(a, stamp));
    }

    #[test]
    fn for_each_excludes_objects_created_during_pass() {
        let mut arena = Arena::new();
        for i in 0..3 {
            arena.allocate(i);
        }
        let mut visited = Vec::new();
        arena.for_each(|arena, id| {
            let value = arena[id];
            visited.push(value);
            arena.allocate(value + 100);
        });
        visited.sort();
        assert_eq!(visited, vec![0, 1, 2]);
        assert_eq!(arena.len(), 6);
    }

    #[test]
    fn for_each_stops_at_shrunk_live_range() {
        let mut arena = Arena::new();
        let ids: Vec<_> = (0..4).map(|i| arena.allocate(i)).collect();
        let mut calls = 0;
        arena.for_each(|arena, _| {
            calls += 1;
            let target = ids.iter().copied().find(|&id| arena.contains(id));
            if let Some(id) = target {
                arena.erase(id);
            }
        });
        assert!(calls <= 4);
        assert!(arena.len() < 4);
    }

    #[test]
    fn retain_removes_matching_and_reexamines_swapped_in() {
        let mut arena = Arena::new();
        for i in 0..10 {
            arena.allocate(i);
        }
        // Odd values at the tail get swapped into vacated even positions.
        arena.retain(|v| v % 2 == 1);
        let mut left: Vec<_> = arena.iter().copied().collect();
        left.sort();
        assert_eq!(left, vec![1, 3, 5, 7, 9]);
        assert_consistent(&arena);
    }

    #[test]
    fn slot_accessors_agree_with_ids() {
        let mut arena = Arena::new();
        let a = arena.allocate("a");
        let b = arena.allocate("b");
        arena.erase(a);
        assert_eq!(arena.id_at(0), Some(b));
        assert_eq!(arena.slot_at(0), Some((b, &"b")));
        assert_eq!(arena.id_at(1), None);
        let pairs: Vec<_> = arena.iter_slots().collect();
        assert_eq!(pairs, vec![(b, &"b")]);
    }

    #[test]
    fn iter_slots_mut_updates_in_place() {
        let mut arena = Arena::new();
        let a = arena.allocate(1);
        let b = arena.allocate(2);
        for (id, value) in arena.iter_slots_mut() {
            *value += id.0 as i32 * 10;
        }
        assert_eq!(arena[a], 1);
        assert_eq!(arena[b], 12);
    }

    #[test]
    fn try_get_reports_unknown() {
        let mut arena = Arena::new();
        let a = arena.allocate(5);
        assert_eq!(arena.try_get(a), Ok(&5));
        arena.erase(a);
        assert_eq!(arena.try_get(a), Err(ArenaError::UnknownSlot { id: a }));
    }

    #[test]
    #[should_panic]
    fn index_with_never_allocated_id_panics() {
        let arena: Arena<u8> = Arena::new();
        let _ = arena[SlotId(3)];
    }

    #[test]
    fn clone_gets_fresh_instance() {
        let mut arena = Arena::new();
        let a = arena.allocate(1);
        let copy = arena.clone();
        assert_ne!(copy.instance_id(), arena.instance_id());
        assert_eq!(copy[a], 1);
    }

    #[test]
    fn allocate_copy_clones_value() {
        let mut arena = Arena::new();
        let s = String::from("grain");
        let id = arena.allocate_copy(&s);
        assert_eq!(arena[id], s);
    }
}
