//! Fire-and-forget notification surface.
//!
//! The engine never renders toasts itself; it hands [`Notification`]s to a
//! [`Notifier`] collaborator and moves on. The return value of a
//! notification is never consulted.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::event_bus::{BridgeEvent, EventHub};

/// Visual flavor of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A notification for the hosting UI's toast subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
}

impl Notification {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind,
        }
    }

    #[must_use]
    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NotificationKind::Warning)
    }

    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NotificationKind::Error)
    }
}

/// Abstraction over an `addNotification`-style collaborator.
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Fire-and-forget.
    fn notify(&self, notification: Notification);
}

/// Notifier that discards everything. The engine default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// In-memory notifier for testing and snapshots.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all captured notifications.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.lock().expect("notifier poisoned").clone()
    }

    /// Clear all captured notifications.
    pub fn clear(&self) {
        self.entries.lock().expect("notifier poisoned").clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .expect("notifier poisoned")
            .push(notification);
    }
}

/// Notifier that republishes onto the event bridge, for UIs that consume
/// notifications as bridge signals.
#[derive(Clone)]
pub struct HubNotifier {
    hub: Arc<EventHub>,
}

impl HubNotifier {
    #[must_use]
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self { hub }
    }
}

impl Notifier for HubNotifier {
    fn notify(&self, notification: Notification) {
        self.hub.publish(BridgeEvent::Notification { notification });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_notifier_captures_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Notification::warning("a", "first"));
        notifier.notify(Notification::error("b", "second"));
        let seen = notifier.snapshot();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].title, "a");
        assert_eq!(seen[1].kind, NotificationKind::Error);
    }

    #[test]
    fn hub_notifier_republishes_on_the_bridge() {
        let hub = EventHub::with_default_capacity();
        let mut stream = hub.subscribe();
        let notifier = HubNotifier::new(hub);

        notifier.notify(Notification::warning("line", "check it"));
        match stream.try_recv().unwrap() {
            BridgeEvent::Notification { notification } => {
                assert_eq!(notification.title, "line");
                assert_eq!(notification.kind, NotificationKind::Warning);
            }
            other => panic!("unexpected event: {other}"),
        }
    }
}
