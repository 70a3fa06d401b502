//! Shared handles to tracked instances.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A type whose instances can be tracked for changes.
///
/// `Clone` produces the independent snapshot and `PartialEq` is the dirty
/// check. Implemented for every type that satisfies the bounds.
pub trait Trackable: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Trackable for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// A trackable type that is stored under a stable identifier.
pub trait Entity: Trackable {
    /// Identifier type.
    type Id: Clone
        + Eq
        + Hash
        + fmt::Display
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Returns the identifier of this entity.
    fn id(&self) -> Self::Id;
}

/// Identity of a tracked instance.
///
/// Two handles have the same key if and only if they point at the same
/// allocation. The key is only meaningful while some handle is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceKey(usize);

impl InstanceKey {
    fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>() as usize)
    }
}

/// Shared, mutable handle to a tracked instance.
///
/// Cloning a `Tracked` clones the handle, not the value: both clones observe
/// the same instance and compare equal by [`Tracked::key`]. Use
/// [`Tracked::get`] for an independent copy of the value.
pub struct Tracked<T> {
    inner: Arc<RwLock<T>>,
}

impl<T: Trackable> Tracked<T> {
    /// Wraps a value in a new handle.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Locks the instance for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Locks the instance for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Returns an independent copy of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.read().clone()
    }

    /// Replaces the value in place.
    pub fn set(&self, value: T) {
        *self.inner.write() = value;
    }

    /// Applies `f` to the instance under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Returns the identity key of this instance.
    #[must_use]
    pub fn key(&self) -> InstanceKey {
        InstanceKey::of(Arc::as_ptr(&self.inner))
    }

    /// Returns true if both handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Erases the type of this handle.
    #[must_use]
    pub fn erase(&self) -> AnyTracked {
        let inner: Arc<dyn Any + Send + Sync> = self.inner.clone();
        AnyTracked {
            inner,
            key: self.key(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Trackable> From<T> for Tracked<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&*self.inner.read()).finish()
    }
}

/// Type-erased handle to a tracked instance.
///
/// Compared by identity; [`AnyTracked::downcast`] recovers the typed handle.
#[derive(Clone)]
pub struct AnyTracked {
    inner: Arc<dyn Any + Send + Sync>,
    key: InstanceKey,
    type_name: &'static str,
}

impl AnyTracked {
    /// Returns the identity key of the instance.
    #[must_use]
    pub fn key(&self) -> InstanceKey {
        self.key
    }

    /// Returns the Rust type name of the instance.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recovers the typed handle if the instance is a `T`.
    #[must_use]
    pub fn downcast<T: Trackable>(&self) -> Option<Tracked<T>> {
        Arc::clone(&self.inner)
            .downcast::<RwLock<T>>()
            .ok()
            .map(|inner| Tracked { inner })
    }

    /// Returns true if this handle points at `tracked`.
    #[must_use]
    pub fn is<T: Trackable>(&self, tracked: &Tracked<T>) -> bool {
        self.key == tracked.key()
    }
}

impl PartialEq for AnyTracked {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AnyTracked {}

impl fmt::Debug for AnyTracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyTracked")
            .field("type", &self.type_name)
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        value: u32,
    }

    #[test]
    fn clones_share_identity() {
        let a = Tracked::new(Counter { value: 1 });
        let b = a.clone();
        let c = Tracked::new(Counter { value: 1 });

        assert!(a.ptr_eq(&b));
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());

        b.write().value = 2;
        assert_eq!(a.read().value, 2);
    }

    #[test]
    fn get_is_independent_copy() {
        let tracked = Tracked::new(Counter { value: 1 });
        let mut copy = tracked.get();
        copy.value = 10;

        assert_eq!(tracked.read().value, 1);
    }

    #[test]
    fn erased_handle_downcasts() {
        let tracked = Tracked::new(Counter { value: 7 });
        let erased = tracked.erase();

        assert!(erased.is(&tracked));
        assert!(erased.downcast::<String>().is_none());

        let back = erased.downcast::<Counter>().unwrap();
        assert!(back.ptr_eq(&tracked));
        assert_eq!(back.read().value, 7);
    }

    #[test]
    fn update_mutates_in_place() {
        let tracked = Tracked::new(Counter { value: 1 });
        let old = tracked.update(|c| std::mem::replace(&mut c.value, 5));

        assert_eq!(old, 1);
        assert_eq!(tracked.read().value, 5);
    }
}
