/// All errors that can be returned by an `AchievementStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency conflict -- another transaction modified the
    /// record concurrently. The expected version was not found.
    #[error("concurrent conflict on record {id}: expected version {expected_version}, found {found_version}")]
    ConcurrentConflict {
        id: String,
        expected_version: i64,
        found_version: i64,
    },

    /// No record with the given id.
    #[error("record not found: {id}")]
    RecordNotFound { id: String },

    /// A record with this id already exists.
    #[error("record already exists: {id}")]
    AlreadyExists { id: String },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
