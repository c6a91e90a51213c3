use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Spawn a task onto the current tokio runtime
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future)
}

/// A single cancellable delayed callback.
///
/// Scheduling replaces whatever was scheduled before, so at most one callback is pending.
/// The callback runs synchronously once the delay elapses; anything long-running it starts
/// should be spawned separately so that cancelling the timer never interrupts it.
#[derive(Default)]
pub(crate) struct Timer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Timer {
    pub fn new() -> Self { Self::default() }

    pub fn schedule<F>(&self, delay: Duration, callback: F)
    where F: FnOnce() + Send + 'static {
        let task = spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        if let Some(previous) = self.handle.lock().expect("timer lock poisoned").replace(task) {
            previous.abort();
        }
    }

    /// Returns whether a pending callback was cancelled
    pub fn cancel(&self) -> bool {
        match self.handle.lock().expect("timer lock poisoned").take() {
            Some(task) => {
                let pending = !task.is_finished();
                task.abort();
                pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool { self.handle.lock().expect("timer lock poisoned").as_ref().is_some_and(|task| !task.is_finished()) }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(task) = self.handle.get_mut().ok().and_then(Option::take) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_callback() {
        let timer = Timer::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for value in [1, 2, 3] {
            let fired = fired.clone();
            timer.schedule(Duration::from_millis(50), move || {
                fired.fetch_add(value, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(timer.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let timer = Timer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let fired = fired.clone();
            timer.schedule(Duration::from_millis(20), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(timer.cancel());
        assert!(!timer.cancel());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
