use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::task::Timer;

/// Wrap `callback` so that only the last call of a burst runs, `delay` after that call.
pub fn debounce<A, F>(callback: F, delay: Duration) -> Debounce<A>
where F: Fn(A) + Send + Sync + 'static {
    Debounce(Arc::new(DebounceInner { callback: Arc::new(callback), delay, timer: Timer::new() }))
}

/// Wrap `callback` so that it runs at most once per `limit`.
/// Calls inside the window are dropped, not deferred.
pub fn throttle<A, F>(callback: F, limit: Duration) -> Throttle<A>
where F: Fn(A) + Send + Sync + 'static {
    Throttle(Arc::new(ThrottleInner { callback: Box::new(callback), limit, last_run: Mutex::new(None) }))
}

/// Cloning shares the pending call, so every clone debounces together.
pub struct Debounce<A>(Arc<DebounceInner<A>>);

struct DebounceInner<A> {
    callback: Arc<dyn Fn(A) + Send + Sync>,
    delay: Duration,
    timer: Timer,
}

impl<A> Clone for Debounce<A> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<A: Send + 'static> Debounce<A> {
    /// Replace any pending call with this one. Must be called within a tokio runtime.
    pub fn call(&self, args: A) {
        let callback = self.0.callback.clone();
        self.0.timer.schedule(self.0.delay, move || callback(args));
    }

    /// Drop the pending call, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool { self.0.timer.cancel() }

    pub fn is_pending(&self) -> bool { self.0.timer.is_pending() }
}

/// Leading-edge throttle. Cloning shares the window.
pub struct Throttle<A>(Arc<ThrottleInner<A>>);

struct ThrottleInner<A> {
    callback: Box<dyn Fn(A) + Send + Sync>,
    limit: Duration,
    last_run: Mutex<Option<Instant>>,
}

impl<A> Clone for Throttle<A> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<A> Throttle<A> {
    /// Run the callback now unless it ran less than `limit` ago. Returns whether it ran.
    pub fn call(&self, args: A) -> bool {
        let now = Instant::now();
        {
            let mut last_run = self.0.last_run.lock().expect("throttle lock poisoned");
            if last_run.is_some_and(|last| now.duration_since(last) < self.0.limit) {
                return false;
            }
            *last_run = Some(now);
        }
        (self.0.callback)(args);
        true
    }
}
