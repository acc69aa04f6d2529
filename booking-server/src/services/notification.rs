//! Notification service interface
//!
//! Fire-and-forget: delivery failures are logged, never propagated to
//! the caller of a modification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Notification templates the engine emits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationTemplate {
    PartySizeChanged,
    BookingDateChanged,
    BookingCancelled,
    WaitlistJoined,
    WaitlistSpotAvailable,
    WaitlistSpotClaimed,
}

/// Notification service contract
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Send a templated notification. Implementations swallow and log
    /// their own failures.
    async fn send(&self, recipient: &str, template: NotificationTemplate, data: serde_json::Value);
}

/// Notifier that writes every send to the log
pub struct LogNotificationService;

#[async_trait]
impl NotificationService for LogNotificationService {
    async fn send(&self, recipient: &str, template: NotificationTemplate, data: serde_json::Value) {
        tracing::info!(%recipient, ?template, %data, "Notification sent (log notifier)");
    }
}

/// Recording notifier for tests
#[derive(Default)]
pub struct MockNotificationService {
    sent: Mutex<Vec<(String, NotificationTemplate, serde_json::Value)>>,
}

impl MockNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, NotificationTemplate, serde_json::Value)> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    /// Templates delivered to a recipient, in send order
    pub fn templates_for(&self, recipient: &str) -> Vec<NotificationTemplate> {
        self.sent
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .filter(|(r, _, _)| r == recipient)
            .map(|(_, t, _)| *t)
            .collect()
    }
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn send(&self, recipient: &str, template: NotificationTemplate, data: serde_json::Value) {
        self.sent
            .lock()
            .expect("mock lock poisoned")
            .push((recipient.to_string(), template, data));
    }
}
