//! Record status and action kinds.
//!
//! The lowercase string forms below are the canonical wire representation.
//! Every conversion between `Status` and its string form goes through this
//! module; nothing else in the workspace maps status values.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an achievement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl Status {
    /// Canonical wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }

    /// Parse a canonical wire string. Integer codes and other legacy
    /// spellings are not accepted.
    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "draft" => Some(Status::Draft),
            "pending" => Some(Status::Pending),
            "approved" => Some(Status::Approved),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a lifecycle action, without its payload.
///
/// Used for access checks and audit events, where the payload (score,
/// reason) is irrelevant. `Delete` is not a status transition but is
/// access-checked and audited like one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Submit,
    Approve,
    Reject,
    Withdraw,
    Resubmit,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Submit => "submit",
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
            ActionKind::Withdraw => "withdraw",
            ActionKind::Resubmit => "resubmit",
            ActionKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_canonical_strings() {
        for status in [
            Status::Draft,
            Status::Pending,
            Status::Approved,
            Status::Rejected,
        ] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_rejects_legacy_spellings() {
        // Integer codes and capitalized forms showed up in older clients;
        // the boundary rejects them instead of guessing.
        assert_eq!(Status::parse("1"), None);
        assert_eq!(Status::parse("2"), None);
        assert_eq!(Status::parse("Approved"), None);
        assert_eq!(Status::parse("PENDING"), None);
        assert_eq!(Status::parse(""), None);
    }

    #[test]
    fn status_serde_uses_lowercase_strings() {
        let json = serde_json::to_string(&Status::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let back: Status = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(back, Status::Rejected);
        assert!(serde_json::from_str::<Status>("2").is_err());
    }
}
