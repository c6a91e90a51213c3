use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// A change listener. Broadcasts carry no payload; listeners read the current value from the signal they listen to.
pub type Listener = Arc<dyn Fn() + Send + Sync + 'static>;

/// Identifies a broadcast for comparison purposes. Derived from the address of the shared state,
/// so it is stable for as long as any `Broadcast` clone or `ListenerGuard` is alive.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BroadcastId(usize);

impl std::fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{:#x}", self.0) }
}

/// Fan-out notifier. Listeners are called in registration order.
#[derive(Clone, Default)]
pub struct Broadcast(Arc<Inner>);

#[derive(Default)]
struct Inner {
    listeners: RwLock<BTreeMap<usize, Listener>>,
    next_id: AtomicUsize,
}

/// Keeps a listener registered. Dropping the guard removes the listener.
/// A guard does not keep the broadcast alive.
pub struct ListenerGuard {
    inner: Weak<Inner>,
    id: usize,
}

impl Broadcast {
    pub fn new() -> Self { Self::default() }

    pub fn id(&self) -> BroadcastId { BroadcastId(Arc::as_ptr(&self.0) as usize) }

    /// Register a listener. It stays registered until the returned guard is dropped.
    pub fn listen(&self, listener: Listener) -> ListenerGuard {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.listeners.write().expect("listeners lock poisoned").insert(id, listener);
        ListenerGuard { inner: Arc::downgrade(&self.0), id }
    }

    pub fn listener_count(&self) -> usize { self.0.listeners.read().expect("listeners lock poisoned").len() }

    /// Notify every registered listener.
    ///
    /// The listener set is snapshotted first, so listeners may register or drop
    /// guards on this same broadcast while being called.
    pub fn send(&self) {
        let listeners: Vec<Listener> = self.0.listeners.read().expect("listeners lock poisoned").values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }
}

impl std::fmt::Debug for Broadcast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("id", &self.id()).field("listeners", &self.listener_count()).finish()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().expect("listeners lock poisoned").remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_listeners_fire_until_guard_dropped() {
        let broadcast = Broadcast::new();
        let counter = Arc::new(Mutex::new(0));

        let _first = {
            let counter = counter.clone();
            broadcast.listen(Arc::new(move || *counter.lock().unwrap() += 1))
        };
        let second = {
            let counter = counter.clone();
            broadcast.listen(Arc::new(move || *counter.lock().unwrap() += 10))
        };

        broadcast.send();
        assert_eq!(*counter.lock().unwrap(), 11);

        drop(second);
        broadcast.send();
        assert_eq!(*counter.lock().unwrap(), 12);
        assert_eq!(broadcast.listener_count(), 1);
    }

    #[test]
    fn test_listen_during_send_does_not_deadlock() {
        let broadcast = Broadcast::new();
        let counter = Arc::new(Mutex::new(0));

        let _guard = {
            let reentrant = broadcast.clone();
            let counter = counter.clone();
            broadcast.listen(Arc::new(move || {
                *counter.lock().unwrap() += 1;
                let _temporary = reentrant.listen(Arc::new(|| {}));
            }))
        };

        broadcast.send();
        broadcast.send();
        assert_eq!(*counter.lock().unwrap(), 2);
        assert_eq!(broadcast.listener_count(), 1);
    }

    #[test]
    fn test_guard_outliving_broadcast() {
        let broadcast = Broadcast::new();
        let guard = broadcast.listen(Arc::new(|| {}));
        assert_eq!(broadcast.listener_count(), 1);
        drop(broadcast);
        drop(guard);
    }
}
