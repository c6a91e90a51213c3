use std::future::Future;
use std::sync::Arc;

use crate::signal::{Signal, With};

/// Waiting on signal values asynchronously
pub trait Wait<T: 'static> {
    /// Wait for the signal to hold a specific value
    fn wait_value(&self, target: T) -> impl Future<Output = ()> + Send
    where T: PartialEq + Send + Sync;

    /// Wait for the signal to reach a value matching the given predicate
    fn wait_for<F, R>(&self, predicate: F) -> impl Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult,
        R::Output: Send,
        T: Send + Sync;
}

/// Return type of a `wait_for` predicate.
///
/// `Some(output)` stops waiting and resolves with `output`; `None` keeps waiting for the next change.
pub trait WaitResult {
    type Output;
    fn result(self) -> Option<Self::Output>;
}

impl WaitResult for bool {
    type Output = ();
    fn result(self) -> Option<Self::Output> { if self { Some(()) } else { None } }
}

impl<T> WaitResult for Option<T> {
    type Output = T;
    fn result(self) -> Option<Self::Output> { self }
}

impl<T, S> Wait<T> for S
where
    S: Signal + With<T> + Sync,
    T: 'static,
{
    fn wait_value(&self, target: T) -> impl Future<Output = ()> + Send
    where T: PartialEq + Send + Sync {
        self.wait_for(move |value| *value == target)
    }

    fn wait_for<F, R>(&self, predicate: F) -> impl Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult,
        R::Output: Send,
        T: Send + Sync,
    {
        async move {
            // Listen before the first check so a change between check and listen is not missed
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let _guard = self.listen(Arc::new(move || {
                let _ = tx.send(());
            }));

            loop {
                if let Some(output) = self.with(|value| predicate(value).result()) {
                    return output;
                }
                if rx.recv().await.is_none() {
                    // The sender lives inside our own listener, which outlives this loop
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}
