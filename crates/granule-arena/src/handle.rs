//! Typed weak references into an [`Arena`].
//!
//! A [`WeakRef`] is `(id, arena instance, stamp)`, captured from a live id.
//! It never owns and never caches an address: every dereference resolves
//! the id through the arena's current index, so a reference stays usable
//! across compaction until its slot is vacated or reused.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use granule_core::{ArenaError, ArenaInstanceId, SlotId, Stamp};

use crate::poly::{Capability, PolyRef};
use crate::slot_map::Arena;

/// Weak, checkable handle to an object stored in an [`Arena<T>`].
///
/// Valid iff it was captured from the arena it is resolved against and the
/// slot it names still carries the captured stamp. The default value is a
/// null reference that is never valid.
pub struct WeakRef<T> {
    id: SlotId,
    arena: Option<ArenaInstanceId>,
    stamp: Stamp,
    _marker: PhantomData<fn() -> T>,
}

impl<T> WeakRef<T> {
    pub(crate) fn new(id: SlotId, arena: ArenaInstanceId, stamp: Stamp) -> Self {
        Self {
            id,
            arena: Some(arena),
            stamp,
            _marker: PhantomData,
        }
    }

    /// A reference to nothing. Never valid.
    pub fn null() -> Self {
        Self {
            id: SlotId(0),
            arena: None,
            stamp: Stamp(0),
            _marker: PhantomData,
        }
    }

    /// The stable id this reference names.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The stamp captured at construction.
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// The arena instance this reference was captured from, if any.
    pub fn arena_id(&self) -> Option<ArenaInstanceId> {
        self.arena
    }

    /// Whether this is the null reference.
    pub fn is_null(&self) -> bool {
        self.arena.is_none()
    }

    /// Whether the referenced object is still the one captured.
    pub fn is_valid(&self, arena: &Arena<T>) -> bool {
        self.arena == Some(arena.instance_id()) && arena.is_valid(self.id, self.stamp)
    }

    /// Resolve the reference, or `None` if it is stale.
    pub fn get<'a>(&self, arena: &'a Arena<T>) -> Option<&'a T> {
        if self.is_valid(arena) {
            arena.get(self.id)
        } else {
            None
        }
    }

    /// Resolve the reference mutably, or `None` if it is stale.
    pub fn get_mut<'a>(&self, arena: &'a mut Arena<T>) -> Option<&'a mut T> {
        if self.is_valid(arena) {
            arena.get_mut(self.id)
        } else {
            None
        }
    }

    /// Resolve the reference, reporting why it failed.
    pub fn try_get<'a>(&self, arena: &'a Arena<T>) -> Result<&'a T, ArenaError> {
        if self.arena != Some(arena.instance_id()) {
            return Err(ArenaError::ArenaMismatch {
                expected: self.arena,
                found: arena.instance_id(),
            });
        }
        let current = arena
            .stamp(self.id)
            .ok_or(ArenaError::UnknownSlot { id: self.id })?;
        if current != self.stamp {
            return Err(ArenaError::StaleReference {
                id: self.id,
                stamp: self.stamp,
                current,
            });
        }
        arena.try_get(self.id)
    }

    /// Re-type this reference as a polymorphic reference viewed through
    /// capability `C`, keeping its id and stamp.
    pub fn into_poly<C>(self) -> PolyRef<C>
    where
        C: ?Sized + 'static,
        T: Capability<C> + 'static,
    {
        match self.arena {
            Some(arena) => PolyRef::bind::<T>(self.id, arena, self.stamp),
            None => PolyRef::null(),
        }
    }
}

impl<T> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WeakRef<T> {}

impl<T> Default for WeakRef<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> PartialEq for WeakRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.arena == other.arena && self.stamp == other.stamp
    }
}

impl<T> Eq for WeakRef<T> {}

impl<T> Hash for WeakRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.arena.hash(state);
        self.stamp.hash(state);
    }
}

impl<T> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("id", &self.id)
            .field("arena", &self.arena)
            .field("stamp", &self.stamp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_until_erased() {
        let mut arena = Arena::new();
        let id = arena.allocate(7);
        let r = arena.weak_ref(id).unwrap();
        assert!(r.is_valid(&arena));
        assert_eq!(r.get(&arena), Some(&7));

        arena.erase(id);
        assert!(!r.is_valid(&arena));
        assert_eq!(r.get(&arena), None);
    }

    #[test]
    fn stale_after_slot_reuse() {
        let mut arena = Arena::new();
        let id = arena.allocate("old");
        let r = arena.weak_ref(id).unwrap();
        arena.erase(id);
        let reused = arena.allocate("new");
        assert_eq!(reused, id);
        assert!(!r.is_valid(&arena));
        assert!(arena.weak_ref(reused).unwrap().is_valid(&arena));
    }

    #[test]
    fn survives_compaction() {
        let mut arena = Arena::new();
        let a = arena.allocate('a');
        let b = arena.allocate('b');
        let c = arena.allocate('c');
        let rc = arena.weak_ref(c).unwrap();
        // Erasing `a` moves `c` into dense position 0.
        arena.erase(a);
        assert_eq!(arena.id_at(0), Some(c));
        assert_eq!(rc.get(&arena), Some(&'c'));
        assert_eq!(arena[b], 'b');
    }

    #[test]
    fn get_mut_writes_through() {
        let mut arena = Arena::new();
        let id = arena.allocate(1);
        let r = arena.weak_ref(id).unwrap();
        *r.get_mut(&mut arena).unwrap() += 41;
        assert_eq!(arena[id], 42);
    }

    #[test]
    fn null_is_never_valid() {
        let arena: Arena<i32> = Arena::new();
        let r: WeakRef<i32> = WeakRef::default();
        assert!(r.is_null());
        assert!(!r.is_valid(&arena));
        assert!(matches!(
            r.try_get(&arena),
            Err(ArenaError::ArenaMismatch { expected: None, .. })
        ));
    }

    #[test]
    fn other_arena_does_not_resolve() {
        let mut first = Arena::new();
        let mut second = Arena::new();
        let id = first.allocate(1);
        second.allocate(2);
        let r = first.weak_ref(id).unwrap();
        assert!(!r.is_valid(&second));
        assert_eq!(r.get(&second), None);
    }

    #[test]
    fn try_get_reports_staleness() {
        let mut arena = Arena::new();
        let id = arena.allocate(3);
        let r = arena.weak_ref(id).unwrap();
        assert_eq!(r.try_get(&arena), Ok(&3));
        arena.erase(id);
        match r.try_get(&arena) {
            Err(ArenaError::StaleReference { id: got, stamp, current }) => {
                assert_eq!(got, id);
                assert_eq!(stamp, r.stamp());
                assert!(current > stamp);
            }
            other => panic!("expected StaleReference, got {other:?}"),
        }
    }

    #[test]
    fn weak_ref_of_erased_id_is_none() {
        let mut arena = Arena::new();
        let id = arena.allocate(0u8);
        arena.erase(id);
        assert!(arena.weak_ref(id).is_none());
    }

    #[test]
    fn copies_compare_equal() {
        let mut arena = Arena::new();
        let id = arena.allocate(0u8);
        let r = arena.weak_ref(id).unwrap();
        let copy = r;
        assert_eq!(r, copy);
        assert_ne!(r, WeakRef::null());
    }
}
