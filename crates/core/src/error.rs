//! Business-rule error taxonomy.
//!
//! All five variants are recoverable by the caller: re-fetch and retry, or
//! surface to the end user. Infrastructure failures are a separate type
//! (`laurel_storage::StorageError`) and never appear here.

use crate::status::{ActionKind, Status};

/// Errors produced by the review lifecycle. Modeled as typed values so
/// callers must handle every case explicitly; the engine never panics for
/// business-rule violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Malformed score or reason, reported before any state check.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The action is not legal for the record's current status.
    #[error("action '{action}' is not legal in status '{status}'")]
    InvalidTransition { status: Status, action: ActionKind },

    /// The record is visible to the caller, but the caller lacks the
    /// capability or relationship this action requires.
    #[error("actor '{actor_id}' may not perform '{action}'")]
    Forbidden { actor_id: String, action: ActionKind },

    /// The record is absent, tombstoned, or outside the caller's
    /// visibility. Invisible records are indistinguishable from absent ones.
    #[error("achievement not found: {id}")]
    NotFound { id: String },

    /// The caller's last-seen version does not match the stored version.
    #[error("concurrent modification on {id}: expected version {expected}, found {found}")]
    ConcurrentModification { id: String, expected: i64, found: i64 },
}
