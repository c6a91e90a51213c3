//! Optimistic state synchronization.
//!
//! The [`OptimisticEngine`] shows a change the moment it is made and persists it in the
//! background, retrying failed writes and rolling the change back once retries run out.
//! Around it sit independent helpers that callers combine with the engine as they see fit:
//!
//! - [`sequence`]: pure helpers computing the next value of an ordered collection
//! - [`ratelimit`]: [`debounce`] and [`throttle`] wrappers
//! - [`retry`]: [`retry_with_backoff`] for one-off operations
//! - [`batcher`]: a [`Batcher`] that coalesces keyed updates into one flush

pub mod batcher;
pub mod config;
pub mod engine;
pub mod error;
pub mod logger;
pub mod ratelimit;
pub mod retry;
pub mod sequence;
pub mod task;

pub use batcher::Batcher;
pub use config::{BatcherConfig, EngineConfig, RetryPolicy};
pub use engine::{EngineBuilder, Mutation, OptimisticEngine, SyncStatus};
pub use error::SyncError;
pub use logger::{SyncLogger, TracingLogger};
pub use ratelimit::{debounce, throttle, Debounce, Throttle};
pub use retry::{backoff_delay, retry_with_backoff, Backoff};

pub use optisync_signals as signals;
