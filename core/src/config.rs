use std::time::Duration;

use crate::retry::backoff_delay;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Delay between drain passes while mutations remain queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Same delay before every retry pass
    Fixed(Duration),
    /// `base * 2^(n-1)`, capped at `max`, where `n` is the highest retry count among queued mutations
    Exponential { base: Duration, max: Duration },
}

impl RetryPolicy {
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        match *self {
            RetryPolicy::Fixed(delay) => delay,
            RetryPolicy::Exponential { base, max } => backoff_delay(base, retry_count.saturating_sub(1)).min(max),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self { RetryPolicy::Fixed(DEFAULT_RETRY_DELAY) }
}

/// Optimistic engine settings.
///
/// Callbacks and the logger are not part of this struct; they are given to [`crate::EngineBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Quiet period after an update before the queue is drained. Zero drains immediately.
    pub debounce: Duration,
    /// Failed attempts tolerated per mutation before it is rolled back.
    /// A mutation is attempted at most `max_retries + 1` times.
    pub max_retries: u32,
    pub retry_policy: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self { Self { debounce: Duration::ZERO, max_retries: DEFAULT_MAX_RETRIES, retry_policy: RetryPolicy::default() } }
}

impl EngineConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatcherConfig {
    /// Quiet period after the last `add` before the buffer is flushed
    pub delay: Duration,
}

impl BatcherConfig {
    pub fn new(delay: Duration) -> Self { Self { delay } }
}

impl Default for BatcherConfig {
    fn default() -> Self { Self::new(DEFAULT_BATCH_DELAY) }
}
