#![allow(unused)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use optisync_core::{Mutation, SyncLogger};
use tracing::Level;

#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().try_init(); }

/// Number of times a mutation has been attempted
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self) -> usize { self.0.load(Ordering::SeqCst) }

    fn bump(&self) -> usize { self.0.fetch_add(1, Ordering::SeqCst) }
}

/// Always persists
pub fn succeeding(calls: &Calls) -> impl Mutation {
    let calls = calls.clone();
    move || {
        calls.bump();
        async { anyhow::Ok(()) }
    }
}

/// Never persists
pub fn failing(calls: &Calls) -> impl Mutation {
    let calls = calls.clone();
    move || {
        let attempt = calls.bump();
        async move { Err::<(), _>(anyhow::anyhow!("backend unavailable (attempt {})", attempt + 1)) }
    }
}

/// Fails the first `failures` attempts, then persists
pub fn flaky(calls: &Calls, failures: usize) -> impl Mutation {
    let calls = calls.clone();
    move || {
        let attempt = calls.bump();
        async move {
            anyhow::ensure!(attempt >= failures, "transient failure on attempt {}", attempt + 1);
            Ok(())
        }
    }
}

/// Persists after `delay`
pub fn slow(calls: &Calls, delay: Duration) -> impl Mutation {
    let calls = calls.clone();
    move || {
        calls.bump();
        async move {
            tokio::time::sleep(delay).await;
            anyhow::Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Logger that keeps every message for inspection
#[derive(Default)]
pub struct RecordingLogger {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.messages.lock().unwrap().iter().filter(|(l, _)| *l == level).map(|(_, message)| message.clone()).collect()
    }

    fn record(&self, level: LogLevel, message: &str) { self.messages.lock().unwrap().push((level, message.to_string())) }
}

impl SyncLogger for RecordingLogger {
    fn info(&self, message: &str) { self.record(LogLevel::Info, message) }

    fn warn(&self, message: &str) { self.record(LogLevel::Warn, message) }

    fn error(&self, message: &str) { self.record(LogLevel::Error, message) }
}

/// Returns a callback that records what it is given, and a closure that drains the recorded values
pub fn recorder<T: Send + 'static>() -> (impl Fn(T) + Send + Sync + Clone + 'static, impl Fn() -> Vec<T>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let seen = seen.clone();
        move |value: T| seen.lock().unwrap().push(value)
    };
    let check = move || seen.lock().unwrap().drain(..).collect::<Vec<T>>();
    (record, check)
}
