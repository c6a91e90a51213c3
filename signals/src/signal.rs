pub mod mutable;
pub mod read;

pub use mutable::*;
pub use read::*;

use crate::broadcast::{Broadcast, BroadcastId, Listener, ListenerGuard};
use std::sync::RwLock;

/// Observation capability without regard to the payload value
pub trait Signal {
    fn listen(&self, listener: Listener) -> ListenerGuard;

    fn broadcast_id(&self) -> BroadcastId;
}

/// Returns a clone of the current value
pub trait Get<T> {
    fn get(&self) -> T;
}

/// Borrows the current value for the duration of a closure
pub trait With<T> {
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R;
}

/// Storage shared between a `Mut` and every `Read` derived from it
pub(crate) struct Shared<T> {
    value: RwLock<T>,
    broadcast: Broadcast,
}

impl<T> Shared<T> {
    pub(crate) fn new(value: T) -> Self { Self { value: RwLock::new(value), broadcast: Broadcast::new() } }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.read().expect("signal value lock poisoned");
        f(&guard)
    }

    /// Applies `f` under the write lock, then notifies with the lock released.
    pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.value.write().expect("signal value lock poisoned");
            f(&mut guard)
        };
        self.broadcast.send();
        result
    }

    pub(crate) fn broadcast(&self) -> &Broadcast { &self.broadcast }
}
