use std::future::Future;

use super::{sample_record, TestResult};
use crate::{AchievementStore, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "init",
            "insert_creates_record_at_version_0",
            insert_creates_record_at_version_0(factory).await,
        ),
        TestResult::from_result(
            "init",
            "duplicate_insert_rejected",
            duplicate_insert_rejected(factory).await,
        ),
        TestResult::from_result(
            "init",
            "missing_record_not_found",
            missing_record_not_found(factory).await,
        ),
    ]
}

async fn insert_creates_record_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    store
        .insert_record(&mut snap, sample_record("ach-1", "student-1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;

    let rec = store
        .get_record("ach-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    if rec.owner_id != "student-1" {
        return Err(format!("owner mismatch: {}", rec.owner_id));
    }
    Ok(())
}

async fn duplicate_insert_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    store
        .insert_record(&mut snap, sample_record("ach-1", "student-1"))
        .await
        .map_err(|e| format!("first insert: {e}"))?;
    match store
        .insert_record(&mut snap, sample_record("ach-1", "student-2"))
        .await
    {
        Err(StorageError::AlreadyExists { id }) if id == "ach-1" => {}
        Err(other) => return Err(format!("expected AlreadyExists, got {other}")),
        Ok(()) => return Err("duplicate insert succeeded".to_string()),
    }
    let _ = store.abort_snapshot(snap).await;
    Ok(())
}

async fn missing_record_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.get_record("no-such-id").await {
        Err(StorageError::RecordNotFound { id }) if id == "no-such-id" => Ok(()),
        Err(other) => Err(format!("expected RecordNotFound, got {other}")),
        Ok(_) => Err("found a record that was never inserted".to_string()),
    }
}
