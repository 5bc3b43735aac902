//! Notification side-effect boundary.
//!
//! Delivery transport is an external collaborator; the engine only
//! guarantees the hook fires at-least-once per successful transition,
//! after the commit. A lost notification is acceptable, a phantom one
//! (for a transition that never committed) is not.

use async_trait::async_trait;

use laurel_core::ActionKind;

/// Fire-and-forget notification dispatcher.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Notify `actor_id` that `record_id` underwent `event`.
    async fn notify(&self, actor_id: &str, record_id: &str, event: ActionKind);
}

/// Default dispatcher: emits a structured log line and nothing else.
/// Real delivery (mail, push) plugs in behind the same trait.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, actor_id: &str, record_id: &str, event: ActionKind) {
        tracing::info!(
            actor_id,
            record_id,
            event = event.as_str(),
            "notification dispatched"
        );
    }
}
