use thiserror::Error;

/// Errors surfaced by the sync layer.
///
/// Individual mutation failures never escape the engine; they reach the caller only
/// through the error callback, wrapped as [`SyncError::RolledBack`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("mutation {id} rolled back after {attempts} failed attempt(s): {source}")]
    RolledBack {
        id: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("batch handler failed for {keys} key(s): {source}")]
    BatchFailed {
        keys: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// Identifier of the rolled back mutation, if this is a rollback
    pub fn mutation_id(&self) -> Option<&str> {
        match self {
            SyncError::RolledBack { id, .. } => Some(id),
            SyncError::BatchFailed { .. } => None,
        }
    }
}
