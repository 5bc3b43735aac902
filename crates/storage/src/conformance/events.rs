use std::future::Future;

use laurel_core::{DecisionEvent, Status};

use super::{sample_record, TestResult};
use crate::AchievementStore;

pub(super) async fn run_event_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "events",
            "events_append_in_order",
            events_append_in_order(factory).await,
        ),
        TestResult::from_result(
            "events",
            "events_survive_tombstoning",
            events_survive_tombstoning(factory).await,
        ),
        TestResult::from_result(
            "events",
            "events_are_scoped_to_their_record",
            events_are_scoped_to_their_record(factory).await,
        ),
    ]
}

fn event(id: &str, record_id: &str, action: &str) -> DecisionEvent {
    DecisionEvent {
        id: id.to_string(),
        record_id: record_id.to_string(),
        actor_id: "student-1".to_string(),
        action: action.to_string(),
        from_status: Status::Draft,
        to_status: Status::Pending,
        score: None,
        reason: None,
        occurred_at: "2026-01-02T00:00:00Z".to_string(),
    }
}

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

async fn append_event<S: AchievementStore>(store: &S, evt: DecisionEvent) -> Result<(), String> {
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    store
        .insert_decision_event(&mut snap, evt)
        .await
        .map_err(|e| format!("event: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;
    Ok(())
}

async fn events_append_in_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "ach-1").await?;
    for (i, action) in ["submit", "reject", "resubmit"].iter().enumerate() {
        append_event(&store, event(&format!("evt-{i}"), "ach-1", action)).await?;
    }

    let events = store
        .list_decision_events("ach-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    let actions: Vec<&str> = events.iter().map(|e| e.action.as_str()).collect();
    if actions != ["submit", "reject", "resubmit"] {
        return Err(format!("append order not preserved: {actions:?}"));
    }
    Ok(())
}

async fn events_survive_tombstoning<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "ach-1").await?;
    append_event(&store, event("evt-0", "ach-1", "submit")).await?;

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
    if !rec.deleted {
        return Err("record not tombstoned".to_string());
    }
    let events = store
        .list_decision_events("ach-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    if events.len() != 1 {
        return Err(format!(
            "expected audit history to survive, got {} events",
            events.len()
        ));
    }
    Ok(())
}

async fn events_are_scoped_to_their_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    seed(&store, "ach-1").await?;
    seed(&store, "ach-2").await?;
    append_event(&store, event("evt-0", "ach-1", "submit")).await?;
    append_event(&store, event("evt-1", "ach-2", "submit")).await?;

    let events = store
        .list_decision_events("ach-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    if events.len() != 1 || events[0].record_id != "ach-1" {
        return Err(format!("expected only ach-1 events, got {events:?}"));
    }
    Ok(())
}
