//! The transition engine and review query service.
//!
//! Execution order for a mutating call, fixed so error precedence is
//! deterministic:
//!
//! 1. Load the record for update (absent -> `NotFound`)
//! 2. Visibility check (invisible -> `NotFound`, indistinguishable from absent)
//! 3. Capability check (`Forbidden`)
//! 4. Input validation (`InvalidInput`)
//! 5. Version check (`ConcurrentModification`)
//! 6. State legality + effects (`InvalidTransition`)
//!
//! The record update and its `DecisionEvent` land in one storage snapshot:
//! both commit or neither does. The notification hook fires only after the
//! commit succeeds.

use std::sync::Arc;

use laurel_core::{
    access, query, transition, AchievementRecord, ActionKind, DecisionEvent, LifecycleError, Page,
    RecordFilter, ReviewAction, Session,
};
use laurel_storage::AchievementStore;

use crate::error::EngineError;
use crate::notify::Notifier;

/// Input for creating a new draft record.
#[derive(Debug, Clone)]
pub struct NewAchievement {
    pub title: String,
    pub category: String,
    pub content_refs: Vec<String>,
}

/// Stateless engine over a persistent store. Cheap to clone; one instance
/// is shared across all request handlers.
pub struct ReviewEngine<S: AchievementStore> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
}

impl<S: AchievementStore> Clone for ReviewEngine<S> {
    fn clone(&self) -> Self {
        ReviewEngine {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: AchievementStore> ReviewEngine<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        ReviewEngine { store, notifier }
    }

    /// Create a `Draft` record owned by the calling actor.
    pub async fn create(
        &self,
        session: &Session,
        input: NewAchievement,
    ) -> Result<AchievementRecord, EngineError> {
        if input.title.trim().is_empty() {
            return Err(LifecycleError::InvalidInput {
                message: "title must not be empty".to_string(),
            }
            .into());
        }

        let record = AchievementRecord::new_draft(
            uuid::Uuid::new_v4().to_string(),
            session.actor_id.clone(),
            input.title,
            input.category,
            input.content_refs,
            now_utc(),
        );

        let mut snap = self.store.begin_snapshot().await.map_err(EngineError::infra)?;
        if let Err(e) = self.store.insert_record(&mut snap, record.clone()).await {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(EngineError::from_storage(e, &record.id));
        }
        self.store
            .commit_snapshot(snap)
            .await
            .map_err(EngineError::infra)?;

        tracing::info!(record_id = %record.id, owner_id = %record.owner_id, "achievement created");
        Ok(record)
    }

    /// Apply a lifecycle action, returning the full updated record
    /// (including the new version) so the caller can chain further actions
    /// without re-fetching.
    pub async fn transition(
        &self,
        session: &Session,
        id: &str,
        expected_version: i64,
        action: ReviewAction,
    ) -> Result<AchievementRecord, EngineError> {
        let kind = action.kind();

        let mut snap = self.store.begin_snapshot().await.map_err(EngineError::infra)?;
        let record = match self.store.get_record_for_update(&mut snap, id).await {
            Ok(rec) => rec,
            Err(e) => {
                let _ = self.store.abort_snapshot(snap).await;
                return Err(EngineError::from_storage(e, id));
            }
        };

        if let Err(e) = self.authorize(session, &record, kind) {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(e);
        }

        if let Err(e) = transition::validate_input(&action) {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(e.into());
        }

        if record.version != expected_version {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(LifecycleError::ConcurrentModification {
                id: id.to_string(),
                expected: expected_version,
                found: record.version,
            }
            .into());
        }

        let now = now_utc();
        let outcome = match transition::apply(&record, &action, &session.actor_id, &now) {
            Ok(out) => out,
            Err(e) => {
                let _ = self.store.abort_snapshot(snap).await;
                return Err(e.into());
            }
        };

        let new_version = match self
            .store
            .update_record(&mut snap, outcome.record.clone(), expected_version)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = self.store.abort_snapshot(snap).await;
                return Err(EngineError::from_storage(e, id));
            }
        };

        let event = DecisionEvent {
            id: uuid::Uuid::new_v4().to_string(),
            record_id: record.id.clone(),
            actor_id: session.actor_id.clone(),
            action: kind.as_str().to_string(),
            from_status: outcome.from_status,
            to_status: outcome.to_status,
            score: outcome.record.score,
            reason: outcome.record.rejection_reason.clone(),
            occurred_at: now,
        };
        if let Err(e) = self.store.insert_decision_event(&mut snap, event).await {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(EngineError::from_storage(e, id));
        }

        self.store
            .commit_snapshot(snap)
            .await
            .map_err(EngineError::infra)?;

        let mut updated = outcome.record;
        updated.version = new_version;

        tracing::info!(
            record_id = %updated.id,
            actor_id = %session.actor_id,
            action = kind.as_str(),
            from = outcome.from_status.as_str(),
            to = outcome.to_status.as_str(),
            version = new_version,
            "transition applied"
        );
        self.notifier
            .notify(&updated.owner_id, &updated.id, kind)
            .await;

        Ok(updated)
    }

    /// Tombstone a record. Owner-only; legal only in `Draft`/`Rejected`.
    /// The record disappears from every view, its events stay for audit.
    pub async fn delete(&self, session: &Session, id: &str) -> Result<(), EngineError> {
        let mut snap = self.store.begin_snapshot().await.map_err(EngineError::infra)?;
        let record = match self.store.get_record_for_update(&mut snap, id).await {
            Ok(rec) => rec,
            Err(e) => {
                let _ = self.store.abort_snapshot(snap).await;
                return Err(EngineError::from_storage(e, id));
            }
        };

        if let Err(e) = self.authorize(session, &record, ActionKind::Delete) {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(e);
        }

        if let Err(e) = transition::validate_delete(&record) {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(e.into());
        }

        if let Err(e) = self
            .store
            .tombstone_record(&mut snap, id, record.version)
            .await
        {
            let _ = self.store.abort_snapshot(snap).await;
            return Err(EngineError::from_storage(e, id));
        }

        self.store
            .commit_snapshot(snap)
            .await
            .map_err(EngineError::infra)?;

        tracing::info!(record_id = %id, actor_id = %session.actor_id, "achievement deleted");
        self.notifier
            .notify(&record.owner_id, id, ActionKind::Delete)
            .await;
        Ok(())
    }

    /// Fetch a single record, visibility-gated.
    pub async fn get(&self, session: &Session, id: &str) -> Result<AchievementRecord, EngineError> {
        let record = self
            .store
            .get_record(id)
            .await
            .map_err(|e| EngineError::from_storage(e, id))?;
        if !access::can_view(session, &record) {
            return Err(LifecycleError::NotFound { id: id.to_string() }.into());
        }
        Ok(record)
    }

    /// Role-scoped, filtered, paginated listing.
    pub async fn list(
        &self,
        session: &Session,
        filter: &RecordFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<AchievementRecord>, EngineError> {
        let records = self
            .store
            .list_records(filter.status)
            .await
            .map_err(EngineError::infra)?;
        Ok(query::page_records(&records, session, filter, page, page_size))
    }

    /// Decision history of a record, visibility-gated like the record
    /// itself. Once the record is tombstoned the history answers NotFound
    /// through this API, though the events remain in the store.
    pub async fn history(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Vec<DecisionEvent>, EngineError> {
        // Reuse the record visibility rule, including the tombstone check.
        let _ = self.get(session, id).await?;
        self.store
            .list_decision_events(id)
            .await
            .map_err(|e| EngineError::from_storage(e, id))
    }

    /// Visibility then capability, in that order: a caller who cannot see
    /// the record learns nothing beyond `NotFound`.
    fn authorize(
        &self,
        session: &Session,
        record: &AchievementRecord,
        action: ActionKind,
    ) -> Result<(), EngineError> {
        if !access::can_view(session, record) {
            return Err(LifecycleError::NotFound {
                id: record.id.clone(),
            }
            .into());
        }
        if !access::can_act(session, record, action) {
            return Err(LifecycleError::Forbidden {
                actor_id: session.actor_id.clone(),
                action,
            }
            .into());
        }
        Ok(())
    }
}

/// Current UTC time in the fixed second-precision format used everywhere
/// in Laurel. Fixed-width, so lexicographic order is chronological.
fn now_utc() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_utc_has_fixed_width() {
        let ts = now_utc();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
    }
}
