//! Access and visibility filter.
//!
//! Pure functions answering two independent questions: may this actor see
//! this record at all, and may they perform this action on it. Viewing never
//! implies transition rights, and a caller who cannot see a record must not
//! learn that it exists (the engine reports `NotFound`, not `Forbidden`,
//! for invisible records).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::record::AchievementRecord;
use crate::status::ActionKind;

/// A role capability granted by the external identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// May approve/reject pending records and view everything.
    Reviewer,
    /// May view everything; holds zero transition rights (separation of
    /// duties: admins curate content, never adjudicate achievements).
    Admin,
}

impl Capability {
    /// Parse a capability token as supplied by the identity provider.
    pub fn parse(s: &str) -> Option<Capability> {
        match s {
            "reviewer" => Some(Capability::Reviewer),
            "admin" => Some(Capability::Admin),
            _ => None,
        }
    }
}

/// The caller's identity and capabilities, populated once at request entry
/// and passed explicitly into every call. Never re-derived mid-flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub actor_id: String,
    pub capabilities: BTreeSet<Capability>,
}

impl Session {
    pub fn new(actor_id: impl Into<String>, capabilities: &[Capability]) -> Self {
        Session {
            actor_id: actor_id.into(),
            capabilities: capabilities.iter().copied().collect(),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_owner_of(&self, record: &AchievementRecord) -> bool {
        self.actor_id == record.owner_id
    }
}

/// May the actor see this record (in any state)?
///
/// Owners see their own records; reviewer and admin capabilities see all.
/// Tombstoned records are invisible to everyone.
pub fn can_view(session: &Session, record: &AchievementRecord) -> bool {
    if record.deleted {
        return false;
    }
    session.is_owner_of(record)
        || session.has(Capability::Reviewer)
        || session.has(Capability::Admin)
}

/// May the actor perform this action on this record?
///
/// Purely a capability/relationship check: whether the action is legal for
/// the record's current status is the transition table's concern, so a
/// reviewer poking a non-pending record gets `InvalidTransition`, not
/// `Forbidden`.
pub fn can_act(session: &Session, record: &AchievementRecord, action: ActionKind) -> bool {
    match action {
        ActionKind::Submit | ActionKind::Withdraw | ActionKind::Resubmit | ActionKind::Delete => {
            session.is_owner_of(record)
        }
        ActionKind::Approve | ActionKind::Reject => session.has(Capability::Reviewer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn record_owned_by(owner: &str) -> AchievementRecord {
        AchievementRecord::new_draft(
            "ach-1".to_string(),
            owner.to_string(),
            "t".to_string(),
            "c".to_string(),
            vec![],
            "2026-01-01T00:00:00Z".to_string(),
        )
    }

    const OWNER_ACTIONS: [ActionKind; 4] = [
        ActionKind::Submit,
        ActionKind::Withdraw,
        ActionKind::Resubmit,
        ActionKind::Delete,
    ];

    #[test]
    fn owner_views_and_acts_on_own_record() {
        let rec = record_owned_by("student-1");
        let session = Session::new("student-1", &[]);
        assert!(can_view(&session, &rec));
        for action in OWNER_ACTIONS {
            assert!(can_act(&session, &rec, action), "owner should {}", action);
        }
        assert!(!can_act(&session, &rec, ActionKind::Approve));
        assert!(!can_act(&session, &rec, ActionKind::Reject));
    }

    #[test]
    fn stranger_sees_and_does_nothing() {
        let rec = record_owned_by("student-1");
        let session = Session::new("student-2", &[]);
        assert!(!can_view(&session, &rec));
        for action in [
            ActionKind::Submit,
            ActionKind::Approve,
            ActionKind::Reject,
            ActionKind::Withdraw,
            ActionKind::Resubmit,
            ActionKind::Delete,
        ] {
            assert!(!can_act(&session, &rec, action));
        }
    }

    #[test]
    fn reviewer_decides_but_never_owns() {
        let rec = record_owned_by("student-1");
        let session = Session::new("teacher-1", &[Capability::Reviewer]);
        assert!(can_view(&session, &rec));
        assert!(can_act(&session, &rec, ActionKind::Approve));
        assert!(can_act(&session, &rec, ActionKind::Reject));
        for action in OWNER_ACTIONS {
            assert!(!can_act(&session, &rec, action));
        }
    }

    #[test]
    fn reviewer_capability_ignores_record_status() {
        // State legality belongs to the transition table; the filter only
        // answers the capability question.
        let mut rec = record_owned_by("student-1");
        rec.status = Status::Draft;
        let session = Session::new("teacher-1", &[Capability::Reviewer]);
        assert!(can_act(&session, &rec, ActionKind::Reject));
    }

    #[test]
    fn admin_views_all_but_transitions_nothing() {
        let rec = record_owned_by("student-1");
        let session = Session::new("admin-1", &[Capability::Admin]);
        assert!(can_view(&session, &rec));
        for action in [
            ActionKind::Submit,
            ActionKind::Approve,
            ActionKind::Reject,
            ActionKind::Withdraw,
            ActionKind::Resubmit,
            ActionKind::Delete,
        ] {
            assert!(!can_act(&session, &rec, action));
        }
    }

    #[test]
    fn tombstoned_record_is_invisible_to_everyone() {
        let mut rec = record_owned_by("student-1");
        rec.deleted = true;
        for session in [
            Session::new("student-1", &[]),
            Session::new("teacher-1", &[Capability::Reviewer]),
            Session::new("admin-1", &[Capability::Admin]),
        ] {
            assert!(!can_view(&session, &rec));
        }
    }

    #[test]
    fn capability_tokens_parse() {
        assert_eq!(Capability::parse("reviewer"), Some(Capability::Reviewer));
        assert_eq!(Capability::parse("admin"), Some(Capability::Admin));
        assert_eq!(Capability::parse("teacher"), None);
        assert_eq!(Capability::parse(""), None);
    }
}
