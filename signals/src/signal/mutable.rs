use std::sync::Arc;

use super::{Read, Shared};

/// Writable signal. It intentionally does not implement `Subscribe`; hand out a `Read` for observation.
pub struct Mut<T>(pub(crate) Arc<Shared<T>>);

impl<T> Mut<T> {
    pub fn new(value: T) -> Self { Self(Arc::new(Shared::new(value))) }

    /// Replace the value and notify listeners
    pub fn set(&self, value: T) {
        tracing::trace!(broadcast = %self.0.broadcast().id(), "signal set");
        self.0.modify(|current| *current = value)
    }

    /// Modify the value in place and notify listeners
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R { self.0.modify(f) }

    /// Borrow the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { self.0.with(f) }

    /// Read-only signal sharing this signal's storage
    pub fn read(&self) -> Read<T> { Read(self.0.clone()) }
}

impl<T: Clone> Mut<T> {
    pub fn peek(&self) -> T { self.0.with(T::clone) }
}

impl<T: PartialEq> Mut<T> {
    /// Like `set`, but listeners are only notified when the value actually changes.
    /// Returns whether it changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        if self.0.with(|current| *current == value) {
            return false;
        }
        self.0.modify(|current| *current = value);
        true
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Mut<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.with(|value| f.debug_tuple("Mut").field(value).finish()) }
}
