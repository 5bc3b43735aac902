use std::future::Future;

use laurel_core::Status;

use super::{sample_record, TestResult};
use crate::{AchievementStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "version",
            "update_with_matching_version_increments",
            update_with_matching_version_increments(factory).await,
        ),
        TestResult::from_result(
            "version",
            "update_with_stale_version_conflicts",
            update_with_stale_version_conflicts(factory).await,
        ),
        TestResult::from_result(
            "version",
            "tombstone_with_stale_version_conflicts",
            tombstone_with_stale_version_conflicts(factory).await,
        ),
    ]
}

/// Seed a store with one committed record and return it.
async fn seed<S: AchievementStore>(store: &S, id: &str) -> Result<(), String> {
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    store
        .insert_record(&mut snap, sample_record(id, "student-1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;
    Ok(())
}

async fn update_with_matching_version_increments<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "ach-1").await?;

    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    let mut rec = store
        .get_record_for_update(&mut snap, "ach-1")
        .await
        .map_err(|e| format!("get for update: {e}"))?;
    rec.status = Status::Pending;
    rec.submitted_at = Some("2026-01-02T00:00:00Z".to_string());
    let new_version = store
        .update_record(&mut snap, rec, 0)
        .await
        .map_err(|e| format!("update: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;

    if new_version != 1 {
        return Err(format!("expected new version 1, got {new_version}"));
    }
    let rec = store
        .get_record("ach-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.version != 1 || rec.status != Status::Pending {
        return Err(format!(
            "expected (1, pending), got ({}, {})",
            rec.version, rec.status
        ));
    }
    Ok(())
}

async fn update_with_stale_version_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "ach-1").await?;

    // First update moves the record to version 1.
    {
        let mut snap = store
            .begin_snapshot()
            .await
            .map_err(|e| format!("begin: {e}"))?;
        let rec = store
            .get_record_for_update(&mut snap, "ach-1")
            .await
            .map_err(|e| format!("get for update: {e}"))?;
        store
            .update_record(&mut snap, rec, 0)
            .await
            .map_err(|e| format!("update: {e}"))?;
        store
            .commit_snapshot(snap)
            .await
            .map_err(|e| format!("commit: {e}"))?;
    }

    // A second update against the stale version 0 must conflict.
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    let rec = store
        .get_record_for_update(&mut snap, "ach-1")
        .await
        .map_err(|e| format!("get for update: {e}"))?;
    match store.update_record(&mut snap, rec, 0).await {
        Err(StorageError::ConcurrentConflict {
            id,
            expected_version,
            ..
        }) if id == "ach-1" && expected_version == 0 => {}
        Err(other) => return Err(format!("expected ConcurrentConflict, got {other}")),
        Ok(v) => return Err(format!("stale update succeeded with version {v}")),
    }
    let _ = store.abort_snapshot(snap).await;

    // The record must be untouched by the failed attempt.
    let rec = store
        .get_record("ach-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.version != 1 {
        return Err(format!("expected version 1 after conflict, got {}", rec.version));
    }
    Ok(())
}

async fn tombstone_with_stale_version_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "ach-1").await?;

    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    match store.tombstone_record(&mut snap, "ach-1", 7).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Err(other) => return Err(format!("expected ConcurrentConflict, got {other}")),
        Ok(()) => return Err("stale tombstone succeeded".to_string()),
    }
    let _ = store.abort_snapshot(snap).await;

    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    store
        .tombstone_record(&mut snap, "ach-1", 0)
        .await
        .map_err(|e| format!("tombstone: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;

    let rec = store
        .get_record("ach-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if !rec.deleted || rec.version != 1 {
        return Err(format!(
            "expected tombstoned at version 1, got deleted={} version={}",
            rec.deleted, rec.version
        ));
    }
    Ok(())
}
