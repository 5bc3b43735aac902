//! Record and audit-event types.

use serde::{Deserialize, Serialize};

use crate::status::Status;

/// One submitted work item and its lifecycle state.
///
/// Consistency invariants, maintained by the transition rules and checked
/// by [`AchievementRecord::check_invariants`]:
/// - `score` is `Some` iff `status == Approved`
/// - `rejection_reason` is `Some` iff `status == Rejected`
/// - `reviewer_id` is `None` while `Draft` or `Pending`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub id: String,
    /// Submitting student. Immutable after creation.
    pub owner_id: String,
    pub title: String,
    pub category: String,
    /// Opaque tokens resolved by the external media store. Never inspected.
    pub content_refs: Vec<String>,
    pub status: Status,
    /// Integer score in `[0, 100]`.
    pub score: Option<i64>,
    pub rejection_reason: Option<String>,
    /// Actor who last moved the record out of `Pending`.
    pub reviewer_id: Option<String>,
    /// UTC timestamp string, fixed second-precision format. Set once per
    /// `Draft -> Pending` transition.
    pub submitted_at: Option<String>,
    /// Set on each decision, cleared on withdrawal back to `Draft`.
    pub decided_at: Option<String>,
    pub created_at: String,
    /// How many times the record has been resubmitted after rejection.
    pub resubmissions: u32,
    /// Optimistic-concurrency token. Starts at 0, +1 per successful mutation.
    pub version: i64,
    /// Tombstone flag. Tombstoned records are invisible to all callers;
    /// their decision events survive for audit.
    pub deleted: bool,
}

impl AchievementRecord {
    /// Build a fresh `Draft` record at version 0.
    pub fn new_draft(
        id: String,
        owner_id: String,
        title: String,
        category: String,
        content_refs: Vec<String>,
        created_at: String,
    ) -> Self {
        AchievementRecord {
            id,
            owner_id,
            title,
            category,
            content_refs,
            status: Status::Draft,
            score: None,
            rejection_reason: None,
            reviewer_id: None,
            submitted_at: None,
            decided_at: None,
            created_at,
            resubmissions: 0,
            version: 0,
            deleted: false,
        }
    }

    /// Verify the status/score/reason consistency invariants.
    pub fn check_invariants(&self) -> bool {
        let score_ok = self.score.is_some() == (self.status == Status::Approved);
        let reason_ok = self.rejection_reason.is_some() == (self.status == Status::Rejected);
        let reviewer_ok = match self.status {
            Status::Draft | Status::Pending => self.reviewer_id.is_none(),
            Status::Approved | Status::Rejected => true,
        };
        score_ok && reason_ok && reviewer_ok
    }
}

/// Immutable audit record of one transition. Append-only; never mutated or
/// deleted, even when the owning record is tombstoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub id: String,
    pub record_id: String,
    /// Actor who performed the transition.
    pub actor_id: String,
    /// Action kind string (`submit`, `approve`, ...). Canonical forms live
    /// in [`crate::status::ActionKind`].
    pub action: String,
    pub from_status: Status,
    pub to_status: Status,
    pub score: Option<i64>,
    pub reason: Option<String>,
    /// UTC timestamp string.
    pub occurred_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_draft_starts_clean_at_version_zero() {
        let rec = AchievementRecord::new_draft(
            "ach-1".to_string(),
            "student-1".to_string(),
            "Solar tracker".to_string(),
            "engineering".to_string(),
            vec!["media://a".to_string()],
            "2026-01-01T00:00:00Z".to_string(),
        );
        assert_eq!(rec.status, Status::Draft);
        assert_eq!(rec.version, 0);
        assert!(rec.score.is_none());
        assert!(rec.rejection_reason.is_none());
        assert!(rec.reviewer_id.is_none());
        assert!(rec.submitted_at.is_none());
        assert!(!rec.deleted);
        assert!(rec.check_invariants());
    }

    #[test]
    fn invariants_catch_stale_score() {
        let mut rec = AchievementRecord::new_draft(
            "ach-1".to_string(),
            "student-1".to_string(),
            "t".to_string(),
            "c".to_string(),
            vec![],
            "2026-01-01T00:00:00Z".to_string(),
        );
        rec.status = Status::Pending;
        rec.score = Some(90);
        assert!(!rec.check_invariants());
    }
}
