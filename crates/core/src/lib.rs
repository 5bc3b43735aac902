//! Laurel review lifecycle core -- pure domain rules for the achievement
//! review state machine.
//!
//! This crate has no IO. It defines the record and audit-event types, the
//! legal transition table, the access/visibility filter, and the query
//! filtering/pagination rules. Orchestration over a store lives in
//! `laurel-engine`; persistence lives in `laurel-storage`.

pub mod access;
pub mod error;
pub mod query;
pub mod record;
pub mod status;
pub mod transition;

pub use access::{can_act, can_view, Capability, Session};
pub use error::LifecycleError;
pub use query::{page_records, Page, RecordFilter};
pub use record::{AchievementRecord, DecisionEvent};
pub use status::{ActionKind, Status};
pub use transition::{apply, validate_input, ReviewAction, TransitionOutcome};
