use std::future::Future;

use laurel_core::{DecisionEvent, Status};

use super::{sample_record, TestResult};
use crate::{AchievementStore, StorageError};

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "commit",
            "committed_snapshot_is_all_or_nothing",
            committed_snapshot_is_all_or_nothing(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "aborted_snapshot_leaves_no_trace",
            aborted_snapshot_leaves_no_trace(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "dropped_snapshot_rolls_back",
            dropped_snapshot_rolls_back(factory).await,
        ),
    ]
}

fn sample_event(record_id: &str) -> DecisionEvent {
    DecisionEvent {
        id: format!("evt-{record_id}"),
        record_id: record_id.to_string(),
        actor_id: "student-1".to_string(),
        action: "submit".to_string(),
        from_status: Status::Draft,
        to_status: Status::Pending,
        score: None,
        reason: None,
        occurred_at: "2026-01-02T00:00:00Z".to_string(),
    }
}

async fn committed_snapshot_is_all_or_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;

    // Record mutation and event append in one snapshot.
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    store
        .insert_record(&mut snap, sample_record("ach-1", "student-1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let mut rec = store
        .get_record_for_update(&mut snap, "ach-1")
        .await
        .map_err(|e| format!("get for update: {e}"))?;
    rec.status = Status::Pending;
    rec.submitted_at = Some("2026-01-02T00:00:00Z".to_string());
    store
        .update_record(&mut snap, rec, 0)
        .await
        .map_err(|e| format!("update: {e}"))?;
    store
        .insert_decision_event(&mut snap, sample_event("ach-1"))
        .await
        .map_err(|e| format!("event: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;

    // Both sides of the transaction must be visible.
    let rec = store
        .get_record("ach-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.status != Status::Pending || rec.version != 1 {
        return Err(format!(
            "expected (pending, 1), got ({}, {})",
            rec.status, rec.version
        ));
    }
    let events = store
        .list_decision_events("ach-1")
        .await
        .map_err(|e| format!("events: {e}"))?;
    if events.len() != 1 {
        return Err(format!("expected 1 event, got {}", events.len()));
    }
    Ok(())
}

async fn aborted_snapshot_leaves_no_trace<S, F, Fut>(factory: &F) -> Result<(), String>
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
        .insert_decision_event(&mut snap, sample_event("ach-1"))
        .await
        .map_err(|e| format!("event: {e}"))?;
    store
        .abort_snapshot(snap)
        .await
        .map_err(|e| format!("abort: {e}"))?;

    match store.get_record("ach-1").await {
        Err(StorageError::RecordNotFound { .. }) => {}
        Err(other) => return Err(format!("expected RecordNotFound, got {other}")),
        Ok(_) => return Err("aborted insert is visible".to_string()),
    }
    let events = store
        .list_decision_events("ach-1")
        .await
        .map_err(|e| format!("events: {e}"))?;
    if !events.is_empty() {
        return Err(format!("aborted event is visible ({} events)", events.len()));
    }
    Ok(())
}

async fn dropped_snapshot_rolls_back<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;

    {
        let mut snap = store
            .begin_snapshot()
            .await
            .map_err(|e| format!("begin: {e}"))?;
        store
            .insert_record(&mut snap, sample_record("ach-1", "student-1"))
            .await
            .map_err(|e| format!("insert: {e}"))?;
        // Snapshot dropped here without commit.
    }

    match store.get_record("ach-1").await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        Err(other) => Err(format!("expected RecordNotFound, got {other}")),
        Ok(_) => Err("dropped snapshot's insert is visible".to_string()),
    }
}
