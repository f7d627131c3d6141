//! Notification dispatcher collaborator.
//!
//! Owners hear about new booking requests, tenants about decisions. Delivery
//! is best-effort: the engine spawns each notification after the transition
//! has committed, and a failure is logged and counted, never surfaced.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// What a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A tenant requested a bed (sent to the owner)
    BookingRequested,
    /// The owner approved a booking (sent to the tenant)
    BookingApproved,
    /// The owner rejected a booking (sent to the tenant)
    BookingRejected,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BookingRequested => "booking_requested",
            Self::BookingApproved => "booking_approved",
            Self::BookingRejected => "booking_rejected",
        };
        f.write_str(name)
    }
}

/// Delivery failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport refused or lost the message
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Outbound notification transport (email, push, ...).
///
/// Returns a boxed future so it can be held as `Arc<dyn Notifier>`.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Delivery` if the message could not be sent.
    fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> BoxFuture<'_, Result<(), NotifyError>>;
}

/// Notifier that writes each message to the log.
#[derive(Clone, Debug)]
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    /// Creates a notifier that signs messages as `sender`
    #[must_use]
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> BoxFuture<'_, Result<(), NotifyError>> {
        let recipient = recipient.to_string();
        Box::pin(async move {
            tracing::info!(
                sender = %self.sender,
                recipient = %recipient,
                kind = %kind,
                payload = %payload,
                "Notification sent"
            );
            Ok(())
        })
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Clone, Debug, PartialEq)]
pub struct SentNotification {
    /// Recipient email
    pub recipient: String,
    /// Kind
    pub kind: NotificationKind,
    /// Body
    pub payload: serde_json::Value,
}

/// Notifier that keeps every message in memory, or fails every delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Creates a notifier that records and succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that records and then fails every delivery
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Messages attempted so far, oldest first
    #[must_use]
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> BoxFuture<'_, Result<(), NotifyError>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentNotification {
                recipient: recipient.to_string(),
                kind,
                payload,
            });
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(NotifyError::Delivery("mailbox unreachable".to_string()))
            } else {
                Ok(())
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_captures_messages() {
        let notifier = RecordingNotifier::new();
        notifier
            .notify("owner@example.com", NotificationKind::BookingRequested, serde_json::json!({"bed": 1}))
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "owner@example.com");
        assert_eq!(sent[0].kind, NotificationKind::BookingRequested);
    }

    #[tokio::test]
    async fn failing_notifier_still_records() {
        let notifier = RecordingNotifier::failing();
        let result = notifier
            .notify("tenant@example.com", NotificationKind::BookingRejected, serde_json::Value::Null)
            .await;

        assert!(result.is_err());
        assert_eq!(notifier.sent().len(), 1);
    }
}
