//! Defines an abstraction over the event sending mechanism.

use super::events::SessionEvent;
use tokio::sync::mpsc::UnboundedSender;

/// A trait that abstracts the sending of session events.
/// This is "fire-and-forget" and doesn't return a result, simplifying its use.
pub trait EventProxy: Send + Sync + Clone + 'static {
    fn send_event(&self, event: SessionEvent);
}

/// Delivers events over a tokio channel. A closed receiver is logged and otherwise ignored.
impl EventProxy for UnboundedSender<SessionEvent> {
    fn send_event(&self, event: SessionEvent) {
        if let Err(e) = self.send(event) {
            tracing::warn!("Failed to deliver session event: {}", e);
        }
    }
}

/// Drops every event. For hosts that poll the session instead of observing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProxy;

impl EventProxy for NoopProxy {
    fn send_event(&self, _event: SessionEvent) {}
}
