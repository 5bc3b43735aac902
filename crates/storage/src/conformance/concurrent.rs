use std::future::Future;
use std::sync::Arc;

use laurel_core::Status;

use super::{sample_record, TestResult};
use crate::{AchievementStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 8;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_updates_exactly_one_wins",
            concurrent_updates_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_inserts_exactly_one_wins",
            concurrent_inserts_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "updates_to_different_records_all_succeed",
            updates_to_different_records_all_succeed(factory).await,
        ),
    ]
}

/// N tasks race to update the same record from the version they saw before
/// the race began (0). Exactly one commit succeeds; the rest must get
/// ConcurrentConflict. This is the storage-level guarantee that makes two
/// reviewers deciding from the same stale read safe.
async fn concurrent_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    {
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
            .map_err(|e| format!("commit init: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            let mut rec = s.get_record_for_update(&mut snap, "ach-1").await?;
            rec.status = Status::Pending;
            rec.submitted_at = Some(format!("2026-01-02T00:00:{:02}Z", i));
            // All tasks use expected version 0, as if they read before the race.
            match s.update_record(&mut snap, rec, 0).await {
                Ok(_) => {
                    s.commit_snapshot(snap).await?;
                    Ok(())
                }
                Err(e) => {
                    let _ = s.abort_snapshot(snap).await;
                    Err(e)
                }
            }
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(()) => wins += 1,
            Err(StorageError::ConcurrentConflict { .. }) => conflicts += 1,
            Err(other) => return Err(format!("unexpected error: {other}")),
        }
    }
    if wins != 1 || conflicts != N - 1 {
        return Err(format!("expected 1 win / {} conflicts, got {wins} / {conflicts}", N - 1));
    }

    let rec = store
        .get_record("ach-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.version != 1 {
        return Err(format!("expected final version 1, got {}", rec.version));
    }
    Ok(())
}

async fn concurrent_inserts_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            match s
                .insert_record(&mut snap, sample_record("ach-1", "student-1"))
                .await
            {
                Ok(()) => {
                    s.commit_snapshot(snap).await?;
                    Ok(())
                }
                Err(e) => {
                    let _ = s.abort_snapshot(snap).await;
                    Err(e)
                }
            }
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(()) => wins += 1,
            Err(StorageError::AlreadyExists { .. }) => {}
            Err(other) => return Err(format!("unexpected error: {other}")),
        }
    }
    if wins != 1 {
        return Err(format!("expected exactly 1 successful insert, got {wins}"));
    }
    Ok(())
}

async fn updates_to_different_records_all_succeed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    {
        let mut snap = store
            .begin_snapshot()
            .await
            .map_err(|e| format!("begin: {e}"))?;
        for i in 0..N {
            store
                .insert_record(&mut snap, sample_record(&format!("ach-{i}"), "student-1"))
                .await
                .map_err(|e| format!("insert {i}: {e}"))?;
        }
        store
            .commit_snapshot(snap)
            .await
            .map_err(|e| format!("commit init: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("ach-{i}");
            let mut snap = s.begin_snapshot().await?;
            let mut rec = s.get_record_for_update(&mut snap, &id).await?;
            rec.status = Status::Pending;
            rec.submitted_at = Some("2026-01-02T00:00:00Z".to_string());
            s.update_record(&mut snap, rec, 0).await?;
            s.commit_snapshot(snap).await
        }));
    }

    for handle in handles {
        handle
            .await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("update: {e}"))?;
    }

    for i in 0..N {
        let rec = store
            .get_record(&format!("ach-{i}"))
            .await
            .map_err(|e| format!("get {i}: {e}"))?;
        if rec.version != 1 || rec.status != Status::Pending {
            return Err(format!(
                "record ach-{i}: expected (pending, 1), got ({}, {})",
                rec.status, rec.version
            ));
        }
    }
    Ok(())
}
