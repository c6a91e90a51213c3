/// Logging sink the engine and batcher report through.
///
/// Implementations decide where messages go; the sync layer never stores them.
pub trait SyncLogger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing` under the `optisync` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl SyncLogger for TracingLogger {
    fn info(&self, message: &str) { tracing::info!(target: "optisync", "{}", message) }

    fn warn(&self, message: &str) { tracing::warn!(target: "optisync", "{}", message) }

    fn error(&self, message: &str) { tracing::error!(target: "optisync", "{}", message) }
}
