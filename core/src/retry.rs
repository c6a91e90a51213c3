use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};

/// `base * 2^attempt`, saturating at `Duration::MAX`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    match 2u32.checked_pow(attempt) {
        Some(factor) => base.saturating_mul(factor),
        None if base.is_zero() => Duration::ZERO,
        None => Duration::MAX,
    }
}

/// Run `operation` until it succeeds or has been attempted `max_retries + 1` times.
///
/// After failed attempt `n` (zero based) the next attempt waits `base_delay * 2^n`.
/// No delay follows the final attempt; its error is returned as is.
pub async fn retry_with_backoff<T, E, F, Fut>(mut operation: F, max_retries: u32, base_delay: Duration) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= max_retries => {
                debug!(attempts = attempt + 1, %error, "giving up");
                return Err(error);
            }
            Err(error) => {
                let delay = backoff_delay(base_delay, attempt);
                debug!(attempt, ?delay, %error, "attempt failed, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// `retry_with_backoff` settings bundled for reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self { Self { max_retries: DEFAULT_MAX_RETRIES, base_delay: DEFAULT_RETRY_DELAY } }
}

impl Backoff {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self { Self { max_retries, base_delay } }

    pub async fn retry<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        retry_with_backoff(operation, self.max_retries, self.base_delay).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_delay() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(8000));
        assert_eq!(backoff_delay(base, 64), Duration::MAX);
        assert_eq!(backoff_delay(Duration::ZERO, 64), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<&str, String> = retry_with_backoff(
            || {
                let calls = calls.clone();
                async move {
                    let call = calls.fetch_add(1, Ordering::SeqCst);
                    if call < 2 {
                        Err(format!("failure {call}"))
                    } else {
                        Ok("stored")
                    }
                }
            },
            3,
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(result, Ok("stored"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms after the first failure, 200ms after the second
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(310), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_exhaustion() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let started = Instant::now();

        let result: Result<(), String> = Backoff::new(2, Duration::from_millis(10))
            .retry(|| {
                let attempts = attempts.clone();
                async move {
                    let mut attempts = attempts.lock().unwrap();
                    let attempt = attempts.len();
                    attempts.push(attempt);
                    Err(format!("attempt {} failed", attempts.len()))
                }
            })
            .await;

        assert_eq!(result, Err("attempt 3 failed".to_string()));
        assert_eq!(*attempts.lock().unwrap(), vec![0, 1, 2]);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(30) && elapsed < Duration::from_millis(40), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_zero_retries_attempts_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope") }
            },
            0,
            Duration::from_secs(60),
        )
        .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
