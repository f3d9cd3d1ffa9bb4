//! Polymorphic weak references.
//!
//! A [`PolyRef<C>`] names "some object that can be viewed as `C`", where
//! `C` is usually a trait object such as `dyn Shape`. The concrete type is
//! erased at capture time: the reference keeps the id, arena instance and
//! stamp, plus a shared accessor that downcasts the arena's type-erased
//! slot back to the concrete type and views it as `C`.
//!
//! Arenas are reached through the object-safe [`SlotProvider`] trait, so a
//! collection of `PolyRef<dyn Shape>` can span arenas of different element
//! types. A reference only resolves against the arena it was captured
//! from; the downcast is checked, so a mismatched provider yields `None`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use granule_core::{ArenaInstanceId, SlotId, Stamp};

use crate::slot_map::Arena;

// ── SlotProvider ────────────────────────────────────────────────

/// Type-erased, read/write view of an arena.
///
/// Implemented for every [`Arena<T>`] with `T: 'static`. The trait is
/// object safe; heterogeneous collections of arenas are held as
/// `&dyn SlotProvider`.
pub trait SlotProvider {
    /// Identity of the underlying arena.
    fn arena_id(&self) -> ArenaInstanceId;

    /// The live object named by `id`, type-erased.
    fn get_any(&self, id: SlotId) -> Option<&dyn Any>;

    /// The live object named by `id`, type-erased and mutable.
    fn get_any_mut(&mut self, id: SlotId) -> Option<&mut dyn Any>;

    /// Whether `id` is live and its slot carries `stamp`.
    fn is_current(&self, id: SlotId, stamp: Stamp) -> bool;
}

impl<T: 'static> SlotProvider for Arena<T> {
    fn arena_id(&self) -> ArenaInstanceId {
        self.instance_id()
    }

    fn get_any(&self, id: SlotId) -> Option<&dyn Any> {
        self.get(id).map(|value| value as &dyn Any)
    }

    fn get_any_mut(&mut self, id: SlotId) -> Option<&mut dyn Any> {
        self.get_mut(id).map(|value| value as &mut dyn Any)
    }

    fn is_current(&self, id: SlotId, stamp: Stamp) -> bool {
        self.is_valid(id, stamp)
    }
}

// ── Capability ──────────────────────────────────────────────────

/// "`Self` can be viewed as `C`."
///
/// Every type is a capability of itself. Implement it for a concrete type
/// and a trait object to make the type reachable through
/// `PolyRef<dyn Trait>`:
///
/// ```
/// use granule_arena::{Arena, Capability, PolyRef};
///
/// trait Shape {
///     fn area(&self) -> f64;
/// }
///
/// struct Square(f64);
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.0 * self.0
///     }
/// }
///
/// impl Capability<dyn Shape> for Square {
///     fn as_capability(&self) -> &(dyn Shape + 'static) {
///         self
///     }
///     fn as_capability_mut(&mut self) -> &mut (dyn Shape + 'static) {
///         self
///     }
/// }
///
/// let mut squares = Arena::new();
/// let id = squares.allocate(Square(3.0));
/// let shape: PolyRef<dyn Shape> = squares.poly_ref(id).unwrap();
/// assert_eq!(shape.get(&squares).map(|s| s.area()), Some(9.0));
/// ```
pub trait Capability<C: ?Sized> {
    /// View `self` as `C`.
    fn as_capability(&self) -> &C;
    /// View `self` mutably as `C`.
    fn as_capability_mut(&mut self) -> &mut C;
}

impl<T: ?Sized> Capability<T> for T {
    fn as_capability(&self) -> &T {
        self
    }

    fn as_capability_mut(&mut self) -> &mut T {
        self
    }
}

// ── Accessors ───────────────────────────────────────────────────

struct Access<C: ?Sized> {
    get: Box<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a C> + Send + Sync>,
    get_mut: Box<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut C> + Send + Sync>,
}

fn downcast_ref<U, C>(any: &dyn Any) -> Option<&C>
where
    U: Capability<C> + 'static,
    C: ?Sized,
{
    any.downcast_ref::<U>().map(<U as Capability<C>>::as_capability)
}

fn downcast_mut<U, C>(any: &mut dyn Any) -> Option<&mut C>
where
    U: Capability<C> + 'static,
    C: ?Sized,
{
    any.downcast_mut::<U>()
        .map(<U as Capability<C>>::as_capability_mut)
}

// Pins closure signatures to the higher-ranked form.
fn getter<C: ?Sized, F>(f: F) -> F
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a C>,
{
    f
}

fn getter_mut<C: ?Sized, F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut C>,
{
    f
}

// ── PolyRef ─────────────────────────────────────────────────────

/// Weak reference to an object viewed through capability `C`.
///
/// Holds no borrow of any arena. Validity follows the same rule as
/// [`WeakRef`](crate::WeakRef): same arena instance, same stamp.
pub struct PolyRef<C: ?Sized + 'static> {
    id: SlotId,
    arena: Option<ArenaInstanceId>,
    stamp: Stamp,
    access: Option<Arc<Access<C>>>,
}

impl<C: ?Sized + 'static> PolyRef<C> {
    pub(crate) fn bind<U>(id: SlotId, arena: ArenaInstanceId, stamp: Stamp) -> Self
    where
        U: Capability<C> + 'static,
    {
        let access = Access {
            get: Box::new(downcast_ref::<U, C>),
            get_mut: Box::new(downcast_mut::<U, C>),
        };
        Self {
            id,
            arena: Some(arena),
            stamp,
            access: Some(Arc::new(access)),
        }
    }

    /// A reference to nothing. Never valid.
    pub fn null() -> Self {
        Self {
            id: SlotId(0),
            arena: None,
            stamp: Stamp(0),
            access: None,
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
        self.access.is_none()
    }

    /// Whether the referenced object is still the one captured, judged
    /// against `provider`.
    pub fn is_valid<P>(&self, provider: &P) -> bool
    where
        P: SlotProvider + ?Sized,
    {
        self.arena == Some(provider.arena_id()) && provider.is_current(self.id, self.stamp)
    }

    /// Resolve against `provider`.
    ///
    /// Returns `None` when the reference is null or stale, when `provider`
    /// is not the arena it was captured from, or when the stored object is
    /// not of the captured type.
    pub fn get<'a, P>(&self, provider: &'a P) -> Option<&'a C>
    where
        P: SlotProvider + ?Sized,
    {
        if !self.is_valid(provider) {
            return None;
        }
        let access = self.access.as_ref()?;
        (access.get)(provider.get_any(self.id)?)
    }

    /// Resolve mutably against `provider`.
    pub fn get_mut<'a, P>(&self, provider: &'a mut P) -> Option<&'a mut C>
    where
        P: SlotProvider + ?Sized,
    {
        if !self.is_valid(&*provider) {
            return None;
        }
        let access = self.access.as_ref()?;
        (access.get_mut)(provider.get_any_mut(self.id)?)
    }

    /// Resolve against whichever of `providers` this reference was
    /// captured from.
    pub fn resolve<'a>(&self, providers: &[&'a dyn SlotProvider]) -> Option<&'a C> {
        let arena = self.arena?;
        let provider = providers.iter().find(|p| p.arena_id() == arena)?;
        self.get(*provider)
    }

    /// Mutable counterpart of [`resolve`](Self::resolve).
    pub fn resolve_mut<'s>(
        &self,
        providers: &'s mut [&mut dyn SlotProvider],
    ) -> Option<&'s mut C> {
        let arena = self.arena?;
        let provider = providers.iter_mut().find(|p| p.arena_id() == arena)?;
        self.get_mut(&mut **provider)
    }

    /// View the same object through a capability `B` of `C`.
    pub fn upcast<B>(&self) -> PolyRef<B>
    where
        B: ?Sized + 'static,
        C: Capability<B>,
    {
        let access = self.access.as_ref().map(|inner| {
            let inner_ref = Arc::clone(inner);
            let inner_mut = Arc::clone(inner);
            Arc::new(Access::<B> {
                get: Box::new(getter::<B, _>(move |any| {
                    (inner_ref.get)(any).map(<C as Capability<B>>::as_capability)
                })),
                get_mut: Box::new(getter_mut::<B, _>(move |any| {
                    (inner_mut.get_mut)(any).map(<C as Capability<B>>::as_capability_mut)
                })),
            })
        });
        PolyRef {
            id: self.id,
            arena: self.arena,
            stamp: self.stamp,
            access,
        }
    }
}

impl<C: ?Sized + 'static> Clone for PolyRef<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            arena: self.arena,
            stamp: self.stamp,
            access: self.access.clone(),
        }
    }
}

impl<C: ?Sized + 'static> Default for PolyRef<C> {
    fn default() -> Self {
        Self::null()
    }
}

impl<C: ?Sized + 'static> PartialEq for PolyRef<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.arena == other.arena && self.stamp == other.stamp
    }
}

impl<C: ?Sized + 'static> Eq for PolyRef<C> {}

impl<C: ?Sized + 'static> fmt::Debug for PolyRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolyRef")
            .field("id", &self.id)
            .field("arena", &self.arena)
            .field("stamp", &self.stamp)
            .field("capability", &std::any::type_name::<C>())
            .finish()
    }
}

// Compile-time assertion: references can be handed to worker threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<PolyRef<dyn Any>>();
};
