//! The legal transition table.
//!
//! Four states, five actions:
//!
//! | From     | Action            | To       |
//! |----------|-------------------|----------|
//! | Draft    | submit            | Pending  |
//! | Pending  | approve(score)    | Approved |
//! | Pending  | reject(reason)    | Rejected |
//! | Pending  | withdraw          | Draft    |
//! | Rejected | resubmit          | Pending  |
//!
//! All other (state, action) pairs are `InvalidTransition`. Input validation
//! (score range, non-blank reason) runs before and independently of the
//! state-legality check, so bad input is always reported as `InvalidInput`
//! and never masked by `InvalidTransition`.
//!
//! [`apply`] is pure: it consumes the current record and produces the next
//! one without touching the version field. Version bumping and the atomic
//! pairing with a `DecisionEvent` append are the engine's and the store's
//! concern.

use crate::error::LifecycleError;
use crate::record::AchievementRecord;
use crate::status::{ActionKind, Status};

/// A lifecycle action with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    Submit,
    Approve { score: i64 },
    Reject { reason: String },
    Withdraw,
    Resubmit,
}

impl ReviewAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ReviewAction::Submit => ActionKind::Submit,
            ReviewAction::Approve { .. } => ActionKind::Approve,
            ReviewAction::Reject { .. } => ActionKind::Reject,
            ReviewAction::Withdraw => ActionKind::Withdraw,
            ReviewAction::Resubmit => ActionKind::Resubmit,
        }
    }
}

/// Result of a legal transition: the next record state plus the edge taken.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub record: AchievementRecord,
    pub from_status: Status,
    pub to_status: Status,
}

/// Validate the action payload without consulting record state.
///
/// `approve` requires an integer score in `[0, 100]`; `reject` requires a
/// reason with at least one non-whitespace character.
pub fn validate_input(action: &ReviewAction) -> Result<(), LifecycleError> {
    match action {
        ReviewAction::Approve { score } => {
            if !(0..=100).contains(score) {
                return Err(LifecycleError::InvalidInput {
                    message: format!("score must be in [0, 100], got {}", score),
                });
            }
            Ok(())
        }
        ReviewAction::Reject { reason } => {
            if reason.trim().is_empty() {
                return Err(LifecycleError::InvalidInput {
                    message: "rejection reason must not be empty".to_string(),
                });
            }
            Ok(())
        }
        ReviewAction::Submit | ReviewAction::Withdraw | ReviewAction::Resubmit => Ok(()),
    }
}

/// Apply an action to a record, producing the next record state.
///
/// `actor_id` is recorded as the reviewer on decision edges. `now` is the
/// caller-supplied UTC timestamp string, so the function stays pure and
/// deterministic under test.
pub fn apply(
    record: &AchievementRecord,
    action: &ReviewAction,
    actor_id: &str,
    now: &str,
) -> Result<TransitionOutcome, LifecycleError> {
    validate_input(action)?;

    let from_status = record.status;
    let mut next = record.clone();

    match (record.status, action) {
        (Status::Draft, ReviewAction::Submit) => {
            enter_pending(&mut next, now);
        }
        (Status::Pending, ReviewAction::Approve { score }) => {
            next.status = Status::Approved;
            next.score = Some(*score);
            next.rejection_reason = None;
            next.reviewer_id = Some(actor_id.to_string());
            next.decided_at = Some(now.to_string());
        }
        (Status::Pending, ReviewAction::Reject { reason }) => {
            next.status = Status::Rejected;
            next.score = None;
            next.rejection_reason = Some(reason.trim().to_string());
            next.reviewer_id = Some(actor_id.to_string());
            next.decided_at = Some(now.to_string());
        }
        (Status::Pending, ReviewAction::Withdraw) => {
            next.status = Status::Draft;
            next.reviewer_id = None;
            next.decided_at = None;
        }
        (Status::Rejected, ReviewAction::Resubmit) => {
            enter_pending(&mut next, now);
            next.resubmissions += 1;
        }
        (status, action) => {
            return Err(LifecycleError::InvalidTransition {
                status,
                action: action.kind(),
            });
        }
    }

    debug_assert!(next.check_invariants());

    Ok(TransitionOutcome {
        to_status: next.status,
        record: next,
        from_status,
    })
}

/// Check that a record may be deleted: only `Draft` and `Rejected` records
/// may go, so `Pending` and `Approved` history stays intact for audit.
pub fn validate_delete(record: &AchievementRecord) -> Result<(), LifecycleError> {
    match record.status {
        Status::Draft | Status::Rejected => Ok(()),
        status => Err(LifecycleError::InvalidTransition {
            status,
            action: ActionKind::Delete,
        }),
    }
}

/// Shared `submit`/`resubmit` effects: move to `Pending`, stamp
/// `submitted_at`, and clear every decision artifact so a prior cycle's
/// score or reason can never leak into the new review round.
fn enter_pending(record: &mut AchievementRecord, now: &str) {
    record.status = Status::Pending;
    record.submitted_at = Some(now.to_string());
    record.decided_at = None;
    record.score = None;
    record.rejection_reason = None;
    record.reviewer_id = None;
}
