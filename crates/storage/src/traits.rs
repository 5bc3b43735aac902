use async_trait::async_trait;

use laurel_core::{AchievementRecord, DecisionEvent, Status};

use crate::error::StorageError;

/// The storage trait for achievement review backends.
///
/// An `AchievementStore` implementation provides durable, transactional
/// storage for achievement records and their append-only decision events.
///
/// ## Snapshot semantics
///
/// All mutating operations take `&mut Self::Snapshot`, a type representing
/// an in-progress transaction:
///
/// 1. `begin_snapshot()` -- start a transaction, returns a `Snapshot`
/// 2. Call mutating methods with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` -- commit and consume the transaction
///    OR `abort_snapshot(snapshot)` -- roll back and consume the transaction
///
/// If a `Snapshot` is dropped without committing, the underlying transaction
/// MUST be rolled back. This is what makes a transition atomic: the record
/// update and its `DecisionEvent` append land in one snapshot, so either
/// both are durable or neither is, and no reader ever observes a record in
/// a partially-applied state.
///
/// ## OCC conflict detection
///
/// `update_record` and `tombstone_record` are conditional on
/// `version == expected_version`. On mismatch they return
/// `Err(StorageError::ConcurrentConflict { .. })` and apply nothing. The
/// store owns version numbering: a successful update stores the record at
/// `expected_version + 1`.
///
/// ## Tombstones
///
/// Deletion never purges: `tombstone_record` flags the record and leaves its
/// decision events in place so audit history survives. Read methods return
/// tombstoned records as-is; visibility is the caller's policy.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` to be shared across
/// async request handlers.
#[async_trait]
pub trait AchievementStore: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this backend. Must be `Send`.
    type Snapshot: Send;

    // ── Snapshot lifecycle ──────────────────────────────────────────────

    /// Begin a new snapshot (transaction).
    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Commit a snapshot, making all mutations durable.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort (roll back) a snapshot, discarding all mutations.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Record operations (within snapshot) ─────────────────────────────

    /// Insert a freshly created record (version 0).
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if the id is taken.
    async fn insert_record(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AchievementRecord,
    ) -> Result<(), StorageError>;

    /// Read a record's current state for update within this snapshot.
    ///
    /// `SELECT ... FOR UPDATE` semantics: no other transaction may modify
    /// the record until this snapshot commits or aborts.
    async fn get_record_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        id: &str,
    ) -> Result<AchievementRecord, StorageError>;

    /// Apply a version-validated update (OCC).
    ///
    /// Stores `record` at `expected_version + 1` if the current version
    /// matches `expected_version`, and returns the new version. The version
    /// carried inside `record` is ignored; the store numbers versions.
    async fn update_record(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AchievementRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError>;

    /// Flag a record as deleted (OCC-checked), preserving its events.
    async fn tombstone_record(
        &self,
        snapshot: &mut Self::Snapshot,
        id: &str,
        expected_version: i64,
    ) -> Result<(), StorageError>;

    /// Append a decision event.
    ///
    /// Must be called in the SAME snapshot as the record mutation it
    /// documents: no state change without its audit event.
    async fn insert_decision_event(
        &self,
        snapshot: &mut Self::Snapshot,
        event: DecisionEvent,
    ) -> Result<(), StorageError>;

    // ── Query operations (outside snapshot) ─────────────────────────────

    /// Read a record's current state without locking.
    async fn get_record(&self, id: &str) -> Result<AchievementRecord, StorageError>;

    /// List all records, optionally filtered by status. Includes tombstoned
    /// records; visibility filtering is the caller's concern.
    async fn list_records(
        &self,
        status_filter: Option<Status>,
    ) -> Result<Vec<AchievementRecord>, StorageError>;

    /// List a record's decision events in append order. Events of
    /// tombstoned records are still returned.
    async fn list_decision_events(
        &self,
        record_id: &str,
    ) -> Result<Vec<DecisionEvent>, StorageError>;
}
