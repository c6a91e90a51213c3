mod queue;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::BoxFuture;
use optisync_signals::{Get, Mut, Read, Subscribe, SubscriptionGuard, Wait};
use strum::Display;

use crate::{
    config::EngineConfig,
    error::SyncError,
    logger::{SyncLogger, TracingLogger},
    task::{spawn, Timer},
};
use queue::{Failure, PendingQueue, Seq};

/// Engine-wide sync state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SyncStatus {
    /// Nothing queued and no rollback in the last pass
    #[default]
    Synced,
    /// A drain pass is running, or mutations are waiting for their next attempt
    Syncing,
    /// The last drain pass rolled back at least one mutation. Others may still be queued.
    Error,
}

/// The durable write behind one optimistic change. Called once per attempt.
///
/// Implemented for any `Fn() -> impl Future<Output = anyhow::Result<()>>`.
pub trait Mutation: Send + Sync + 'static {
    fn run(&self) -> BoxFuture<'static, anyhow::Result<()>>;
}

impl<F, Fut> Mutation for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run(&self) -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(self()) }
}

/// Called once for every mutation that is rolled back
pub type ErrorCallback = Arc<dyn Fn(&SyncError) + Send + Sync>;
/// Called once for every mutation that persists, with its id and optimistic value
pub type SuccessCallback<T> = Arc<dyn Fn(&str, &T) + Send + Sync>;

/// Holds a value that changes instantly while the writes behind each change are persisted in the background.
///
/// Every [`update`](Self::update) shows its value immediately and queues its mutation. Queued mutations
/// are drained in update order, one pass at a time. A failed mutation is retried on later passes until
/// it has failed `max_retries + 1` times, at which point it is dropped and its change rolled back.
///
/// Must be used within a tokio runtime. Cloning shares the same state; dropping the last clone cancels
/// any scheduled pass.
///
/// ```rust,no_run
/// use optisync_core::{EngineConfig, OptimisticEngine};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let engine = OptimisticEngine::builder("draft".to_string())
///         .config(EngineConfig::default().with_max_retries(1))
///         .on_error(|error| eprintln!("{error}"))
///         .build();
///
///     engine.update("task-1", "done".to_string(), || async {
///         // persist "done" somewhere
///         Ok::<_, anyhow::Error>(())
///     });
///     assert_eq!(engine.current(), "done");
///
///     engine.flush().await;
/// }
/// ```
pub struct OptimisticEngine<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for OptimisticEngine<T> {
    fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

pub struct EngineBuilder<T> {
    initial: T,
    config: EngineConfig,
    logger: Arc<dyn SyncLogger>,
    on_error: Option<ErrorCallback>,
    on_success: Option<SuccessCallback<T>>,
}

impl<T> EngineBuilder<T>
where T: Clone + Send + Sync + 'static
{
    /// Default config, logging through `tracing`, no callbacks
    pub fn new(initial: T) -> Self {
        Self {
            initial,
            config: EngineConfig::default(),
            logger: Arc::new(TracingLogger),
            on_error: None,
            on_success: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn SyncLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where F: Fn(&SyncError) + Send + Sync + 'static {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where F: Fn(&str, &T) + Send + Sync + 'static {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> OptimisticEngine<T> {
        OptimisticEngine {
            inner: Arc::new(Inner {
                config: self.config,
                value: Mut::new(self.initial),
                status: Mut::new(SyncStatus::Synced),
                pending: Mut::new(0),
                queue: Mutex::new(PendingQueue::new()),
                draining: AtomicBool::new(false),
                debounce_timer: Timer::new(),
                retry_timer: Timer::new(),
                logger: self.logger,
                on_error: self.on_error,
                on_success: self.on_success,
            }),
        }
    }
}

struct Inner<T> {
    config: EngineConfig,
    value: Mut<T>,
    status: Mut<SyncStatus>,
    pending: Mut<usize>,
    queue: Mutex<PendingQueue<T>>,
    draining: AtomicBool,
    debounce_timer: Timer,
    retry_timer: Timer,
    logger: Arc<dyn SyncLogger>,
    on_error: Option<ErrorCallback>,
    on_success: Option<SuccessCallback<T>>,
}

/// Single-flight claim on the drain loop, released on drop
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok().map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::Release) }
}

impl<T> OptimisticEngine<T>
where T: Clone + Send + Sync + 'static
{
    pub fn new(initial: T) -> Self { Self::builder(initial).build() }

    pub fn builder(initial: T) -> EngineBuilder<T> { EngineBuilder::new(initial) }

    /// Show `value` now and queue `mutation` to persist it.
    ///
    /// The rollback baseline is whatever is visible at the moment of the call, including values
    /// from earlier updates that are still queued. Each call is its own queue entry, even when `id`
    /// repeats. The queue is drained right away, or once the configured debounce window passes
    /// without another update.
    pub fn update<M>(&self, id: impl Into<String>, value: T, mutation: M)
    where M: Mutation {
        let id = id.into();
        let previous = self.inner.value.update(|current| std::mem::replace(current, value.clone()));
        let pending = {
            let mut queue = self.inner.queue();
            queue.push(id.clone(), value, previous, Arc::new(mutation));
            queue.len()
        };
        self.inner.pending.set(pending);
        self.inner.logger.info(&format!("queued mutation {id} ({pending} pending)"));
        self.inner.schedule_drain();
    }

    /// Cancel any scheduled pass and drain now.
    ///
    /// Returns once the pass completes, or immediately if a pass is already running.
    pub async fn flush(&self) {
        self.inner.debounce_timer.cancel();
        self.inner.retry_timer.cancel();
        self.inner.clone().drain().await;
    }

    /// Cancel scheduled passes and forget every queued mutation. The visible value is left as is.
    pub fn reset(&self) {
        self.inner.debounce_timer.cancel();
        self.inner.retry_timer.cancel();
        let dropped = {
            let mut queue = self.inner.queue();
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        self.inner.pending.set(0);
        self.inner.status.set(SyncStatus::Synced);
        self.inner.logger.info(&format!("reset, {dropped} queued mutation(s) dropped"));
    }

    /// Replace the visible value with a fresh baseline from the backing store.
    ///
    /// Only applied while fully synced; with anything queued or in flight the baseline is ignored so it
    /// cannot clobber an optimistic change. Returns whether it was applied.
    pub fn reconcile(&self, baseline: T) -> bool { self.inner.reconcile(baseline) }

    /// Reconcile against every change of `source` until the returned guard is dropped
    pub fn follow(&self, source: &Read<T>) -> SubscriptionGuard {
        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        source.subscribe(move |baseline: T| {
            if let Some(inner) = inner.upgrade() {
                inner.reconcile(baseline);
            }
        })
    }

    pub fn value(&self) -> Read<T> { self.inner.value.read() }

    pub fn status(&self) -> Read<SyncStatus> { self.inner.status.read() }

    pub fn pending_count(&self) -> Read<usize> { self.inner.pending.read() }

    /// Clone of the visible value
    pub fn current(&self) -> T { self.inner.value.peek() }

    /// Ids of queued mutations in processing order
    pub fn pending_ids(&self) -> Vec<String> { self.inner.queue().ids() }

    pub fn config(&self) -> &EngineConfig { &self.inner.config }

    /// Resolves once nothing is queued and the status is `synced`.
    ///
    /// A pass that rolls back leaves the status at `error` until a later pass completes cleanly or the
    /// engine is reset, so this does not resolve on rollback alone.
    pub async fn wait_synced(&self) {
        let pending = self.pending_count();
        self.status().wait_for(move |status| *status == SyncStatus::Synced && pending.get() == 0).await
    }
}

impl<T> Inner<T>
where T: Clone + Send + Sync + 'static
{
    fn queue(&self) -> MutexGuard<'_, PendingQueue<T>> { self.queue.lock().expect("pending queue lock poisoned") }

    fn schedule_drain(self: &Arc<Self>) {
        if self.config.debounce.is_zero() {
            spawn(self.clone().drain());
            return;
        }
        let inner = Arc::downgrade(self);
        self.debounce_timer.schedule(self.config.debounce, move || {
            if let Some(inner) = inner.upgrade() {
                spawn(inner.drain());
            }
        });
    }

    fn schedule_retry(self: &Arc<Self>) {
        let delay = self.config.retry_policy.delay_for(self.queue().max_retry_count());
        self.logger.info(&format!("retrying queued mutations in {delay:?}"));
        let inner = Arc::downgrade(self);
        self.retry_timer.schedule(delay, move || {
            if let Some(inner) = inner.upgrade() {
                spawn(inner.drain());
            }
        });
    }

    /// One drain pass over the entries queued when it starts
    async fn drain(self: Arc<Self>) {
        if self.queue().is_empty() {
            return;
        }
        let Some(guard) = DrainGuard::acquire(&self.draining) else {
            return;
        };
        self.status.set(SyncStatus::Syncing);

        let snapshot = self.queue().snapshot();
        let mut rolled_back = 0;
        for (seq, mutation) in snapshot {
            // Entries dropped by a reset during this pass are skipped
            let queued = self.queue().contains(seq);
            if !queued {
                continue;
            }
            match mutation.run().await {
                Ok(()) => self.succeeded(seq),
                Err(error) => {
                    if self.failed(seq, error) {
                        rolled_back += 1;
                    }
                }
            }
        }

        let remaining = self.queue().len();
        self.pending.set(remaining);
        if rolled_back > 0 {
            self.status.set(SyncStatus::Error);
        } else if remaining == 0 {
            self.status.set(SyncStatus::Synced);
        }
        drop(guard);

        // An update that landed while the guard was held lost its own drain to this pass
        let remaining = self.queue().len();
        self.pending.set_if_changed(remaining);
        if remaining > 0 {
            if rolled_back == 0 {
                self.status.set_if_changed(SyncStatus::Syncing);
            }
            self.schedule_retry();
        }
    }

    fn succeeded(&self, seq: Seq) {
        let completed = self.queue().complete(seq);
        let Some(entry) = completed else { return };
        self.logger.info(&format!("mutation {} persisted", entry.id));
        if let Some(on_success) = &self.on_success {
            on_success(&entry.id, &entry.optimistic_value);
        }
    }

    /// Returns whether the mutation was rolled back
    fn failed(&self, seq: Seq, error: anyhow::Error) -> bool {
        let failure = self.queue().record_failure(seq, self.config.max_retries);
        match failure {
            Failure::Vanished => false,
            Failure::Retrying { id, attempts } => {
                self.logger.warn(&format!("mutation {id} failed (attempt {attempts}), will retry: {error}"));
                false
            }
            Failure::Exhausted { entry, restore } => {
                if let Some(previous) = restore {
                    self.value.set(previous);
                }
                let error = SyncError::RolledBack { id: entry.id, attempts: entry.retry_count + 1, source: error };
                self.logger.error(&format!("{error} (queued at {})", entry.created_at.to_rfc3339()));
                if let Some(on_error) = &self.on_error {
                    on_error(&error);
                }
                true
            }
        }
    }

    fn reconcile(&self, baseline: T) -> bool {
        let idle = self.queue().is_empty() && !self.draining.load(Ordering::Acquire) && self.status.with(|status| *status == SyncStatus::Synced);
        if idle {
            self.value.set(baseline);
        }
        idle
    }
}
