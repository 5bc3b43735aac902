//! In-memory reference backend.
//!
//! Transactions are serialized: `begin_snapshot` takes an owned lock over
//! the whole store and works on a private copy of the tables. Commit swaps
//! the copy in; abort (or dropping the snapshot) discards it and releases
//! the lock. Coarse, but it gives the exact snapshot and OCC semantics the
//! trait demands, and the engine's transactions are short.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use laurel_core::{AchievementRecord, DecisionEvent, Status};

use crate::error::StorageError;
use crate::traits::AchievementStore;

#[derive(Debug, Clone, Default)]
struct Tables {
    records: BTreeMap<String, AchievementRecord>,
    events: Vec<DecisionEvent>,
}

/// In-memory `AchievementStore` backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

/// An open transaction: the store-wide lock plus a working copy.
pub struct MemorySnapshot {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AchievementStore for MemoryStore {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        let guard = self.inner.clone().lock_owned().await;
        let work = guard.clone();
        Ok(MemorySnapshot { guard, work })
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        let MemorySnapshot { mut guard, work } = snapshot;
        *guard = work;
        Ok(())
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        // Dropping the snapshot discards the working copy and releases the
        // lock; the committed tables were never touched.
        drop(snapshot);
        Ok(())
    }

    async fn insert_record(
        &self,
        snapshot: &mut MemorySnapshot,
        record: AchievementRecord,
    ) -> Result<(), StorageError> {
        if snapshot.work.records.contains_key(&record.id) {
            return Err(StorageError::AlreadyExists {
                id: record.id.clone(),
            });
        }
        snapshot.work.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_record_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        id: &str,
    ) -> Result<AchievementRecord, StorageError> {
        snapshot
            .work
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::RecordNotFound { id: id.to_string() })
    }

    async fn update_record(
        &self,
        snapshot: &mut MemorySnapshot,
        record: AchievementRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError> {
        let current = snapshot.work.records.get(&record.id).ok_or_else(|| {
            StorageError::RecordNotFound {
                id: record.id.clone(),
            }
        })?;
        if current.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                id: record.id.clone(),
                expected_version,
                found_version: current.version,
            });
        }
        let mut next = record;
        next.version = expected_version + 1;
        let new_version = next.version;
        snapshot.work.records.insert(next.id.clone(), next);
        Ok(new_version)
    }

    async fn tombstone_record(
        &self,
        snapshot: &mut MemorySnapshot,
        id: &str,
        expected_version: i64,
    ) -> Result<(), StorageError> {
        let current = snapshot
            .work
            .records
            .get_mut(id)
            .ok_or_else(|| StorageError::RecordNotFound { id: id.to_string() })?;
        if current.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                id: id.to_string(),
                expected_version,
                found_version: current.version,
            });
        }
        current.deleted = true;
        current.version = expected_version + 1;
        Ok(())
    }

    async fn insert_decision_event(
        &self,
        snapshot: &mut MemorySnapshot,
        event: DecisionEvent,
    ) -> Result<(), StorageError> {
        snapshot.work.events.push(event);
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<AchievementRecord, StorageError> {
        let tables = self.inner.lock().await;
        tables
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::RecordNotFound { id: id.to_string() })
    }

    async fn list_records(
        &self,
        status_filter: Option<Status>,
    ) -> Result<Vec<AchievementRecord>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .records
            .values()
            .filter(|r| status_filter.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn list_decision_events(
        &self,
        record_id: &str,
    ) -> Result<Vec<DecisionEvent>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .events
            .iter()
            .filter(|e| e.record_id == record_id)
            .cloned()
            .collect())
    }
}
