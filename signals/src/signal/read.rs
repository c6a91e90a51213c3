use std::sync::{Arc, Weak};

use super::{Get, Shared, Signal, With};
use crate::{
    broadcast::{BroadcastId, Listener, ListenerGuard},
    porcelain::{IntoSubscribeListener, Subscribe, SubscriptionGuard},
};

/// Read-only signal
pub struct Read<T>(pub(crate) Arc<Shared<T>>);

impl<T> Clone for Read<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> With<T> for Read<T> {
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { self.0.with(f) }
}

impl<T: Clone> Get<T> for Read<T> {
    fn get(&self) -> T { self.0.with(T::clone) }
}

impl<T> Signal for Read<T> {
    fn listen(&self, listener: Listener) -> ListenerGuard { self.0.broadcast().listen(listener) }

    fn broadcast_id(&self) -> BroadcastId { self.0.broadcast().id() }
}

impl<T> Subscribe<T> for Read<T>
where T: Clone + Send + Sync + 'static
{
    fn subscribe<L>(&self, listener: L) -> SubscriptionGuard
    where L: IntoSubscribeListener<T> {
        let listener = listener.into_subscribe_listener();
        // Weak, so a subscription never keeps the signal alive
        let shared: Weak<Shared<T>> = Arc::downgrade(&self.0);
        let guard = self.listen(Arc::new(move || {
            if let Some(shared) = shared.upgrade() {
                listener(shared.with(T::clone));
            }
        }));
        SubscriptionGuard::new(guard)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Read<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.with(|value| f.debug_tuple("Read").field(value).finish()) }
}
