use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::{
    config::BatcherConfig,
    error::SyncError,
    logger::{SyncLogger, TracingLogger},
    task::{spawn, Timer},
};

/// Receives every buffered `(key, value)` pair of one flush, in first-insertion order
pub type BatchHandler<V> = Arc<dyn Fn(Vec<(String, V)>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Coalesces rapid keyed updates into one handler call.
///
/// Each `add` overwrites the value for its key and restarts a single shared flush timer,
/// so a flush happens once `delay` passes without any `add` on any key.
/// Cloning shares the buffer.
pub struct Batcher<V>(Arc<Inner<V>>);

struct Inner<V> {
    config: BatcherConfig,
    buffer: Mutex<IndexMap<String, V>>,
    handler: BatchHandler<V>,
    timer: Timer,
    logger: Arc<dyn SyncLogger>,
}

impl<V> Clone for Batcher<V> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<V> Batcher<V>
where V: Clone + Send + 'static
{
    pub fn new<F, Fut>(config: BatcherConfig, handler: F) -> Self
    where
        F: Fn(Vec<(String, V)>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::with_logger(config, Arc::new(TracingLogger), handler)
    }

    pub fn with_logger<F, Fut>(config: BatcherConfig, logger: Arc<dyn SyncLogger>, handler: F) -> Self
    where
        F: Fn(Vec<(String, V)>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: BatchHandler<V> =
            Arc::new(move |batch: Vec<(String, V)>| -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(handler(batch)) });
        Self(Arc::new(Inner { config, buffer: Mutex::new(IndexMap::new()), handler, timer: Timer::new(), logger }))
    }

    /// Store `value` for `key`, replacing any buffered value, and restart the flush timer.
    /// Must be called within a tokio runtime.
    pub fn add(&self, key: impl Into<String>, value: V) {
        self.0.buffer().insert(key.into(), value);

        let inner: Weak<Inner<V>> = Arc::downgrade(&self.0);
        self.0.timer.schedule(self.0.config.delay, move || {
            let Some(inner) = inner.upgrade() else { return };
            spawn(async move {
                // A failed batch is logged and re-buffered for the next flush
                let _ = inner.flush().await;
            });
        });
    }

    /// Cancel the pending timer and hand everything buffered to the handler now.
    ///
    /// If the handler fails, the batch goes back into the buffer and the error is returned.
    pub async fn flush(&self) -> Result<(), SyncError> {
        self.0.timer.cancel();
        self.0.flush().await
    }

    /// Cancel the pending timer and discard the buffer without calling the handler
    pub fn clear(&self) {
        self.0.timer.cancel();
        self.0.buffer().clear();
    }

    pub fn len(&self) -> usize { self.0.buffer().len() }

    pub fn is_empty(&self) -> bool { self.0.buffer().is_empty() }

    pub fn keys(&self) -> Vec<String> { self.0.buffer().keys().cloned().collect() }
}

impl<V> Inner<V>
where V: Clone + Send + 'static
{
    fn buffer(&self) -> MutexGuard<'_, IndexMap<String, V>> { self.buffer.lock().expect("batch buffer lock poisoned") }

    async fn flush(&self) -> Result<(), SyncError> {
        let batch: Vec<(String, V)> = self.buffer().drain(..).collect();
        if batch.is_empty() {
            return Ok(());
        }

        let keys = batch.len();
        match (self.handler)(batch.clone()).await {
            Ok(()) => {
                self.logger.info(&format!("flushed batch of {keys} key(s)"));
                Ok(())
            }
            Err(source) => {
                // Values added for the same key while the handler ran are newer; keep those
                let mut buffer = self.buffer();
                for (key, value) in batch {
                    buffer.entry(key).or_insert(value);
                }
                drop(buffer);
                self.logger.error(&format!("batch handler failed for {keys} key(s): {source}"));
                Err(SyncError::BatchFailed { keys, source })
            }
        }
    }
}
