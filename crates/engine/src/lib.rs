//! Laurel review engine -- orchestrates the pure lifecycle rules from
//! `laurel-core` over an `AchievementStore` backend.
//!
//! The engine is request-scoped and stateless: every call loads the record,
//! runs the access filter and transition rules, and commits the record
//! update together with its `DecisionEvent` in one storage snapshot. The
//! notification hook fires after a successful commit, at-least-once per
//! transition.

mod engine;
mod error;
mod notify;

pub use engine::{NewAchievement, ReviewEngine};
pub use error::EngineError;
pub use notify::{Notifier, TracingNotifier};
