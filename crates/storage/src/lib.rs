//! Durable storage for the achievement review lifecycle.
//!
//! Defines the [`AchievementStore`] trait (snapshot semantics plus
//! optimistic concurrency), the [`MemoryStore`] reference backend, and a
//! backend-agnostic conformance suite any implementation can run.

pub mod conformance;
mod error;
mod memory;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use traits::AchievementStore;
