use crate::broadcast::ListenerGuard;

/// Boxed listener receiving each new value
pub type SubscribeListener<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

/// Types that can be converted into subscribe listeners
pub trait IntoSubscribeListener<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T>;
}

/// Subscribing to changes. The listener is called with the new value after every change,
/// not with the value present at subscription time.
pub trait Subscribe<T: 'static> {
    fn subscribe<L>(&self, listener: L) -> SubscriptionGuard
    where L: IntoSubscribeListener<T>;
}

/// Keeps a subscription alive. Dropping it unsubscribes.
#[must_use = "dropping a SubscriptionGuard unsubscribes immediately"]
pub struct SubscriptionGuard {
    _guard: ListenerGuard,
}

impl SubscriptionGuard {
    pub fn new(guard: ListenerGuard) -> Self { Self { _guard: guard } }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("SubscriptionGuard").finish_non_exhaustive() }
}

impl<F, T> IntoSubscribeListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_subscribe_listener(self) -> SubscribeListener<T> { Box::new(self) }
}

impl<T: Send + 'static> IntoSubscribeListener<T> for std::sync::mpsc::Sender<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T> {
        Box::new(move |value| {
            let _ = self.send(value);
        })
    }
}

#[cfg(feature = "tokio")]
impl<T: Send + 'static> IntoSubscribeListener<T> for tokio::sync::mpsc::UnboundedSender<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T> {
        Box::new(move |value| {
            let _ = self.send(value);
        })
    }
}
