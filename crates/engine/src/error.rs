use laurel_core::LifecycleError;
use laurel_storage::StorageError;

/// Errors returned by the review engine.
///
/// Business-rule violations stay typed as [`LifecycleError`] so callers
/// handle every case; only infrastructure failures surface as `Storage`,
/// to be retried by the caller with backoff. The engine never retries
/// internally -- without a fresh version token a retried mutation is not
/// idempotent.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("storage backend error: {0}")]
    Storage(StorageError),
}

impl EngineError {
    /// Map a storage error encountered while acting on `id` into the
    /// caller-facing taxonomy: missing rows and OCC conflicts are
    /// recoverable lifecycle errors, everything else is infrastructure.
    pub(crate) fn from_storage(e: StorageError, id: &str) -> Self {
        match e {
            StorageError::RecordNotFound { .. } => {
                EngineError::Lifecycle(LifecycleError::NotFound { id: id.to_string() })
            }
            StorageError::ConcurrentConflict {
                expected_version,
                found_version,
                ..
            } => EngineError::Lifecycle(LifecycleError::ConcurrentModification {
                id: id.to_string(),
                expected: expected_version,
                found: found_version,
            }),
            other => EngineError::Storage(other),
        }
    }

    /// Wrap an infrastructure error with no lifecycle interpretation
    /// (snapshot begin/commit failures).
    pub(crate) fn infra(e: StorageError) -> Self {
        EngineError::Storage(e)
    }
}
