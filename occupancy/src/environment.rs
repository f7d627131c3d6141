//! Injected collaborators shared by every reducer.

use crate::metrics::NOTIFICATION_FAILURES;
use crate::notify::{NotificationKind, Notifier};
use bedspace_core::effect::Effect;
use bedspace_core::environment::Clock;
use std::sync::Arc;

/// Environment dependencies for the occupancy reducers
#[derive(Clone)]
pub struct OccupancyEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Outbound notifications
    pub notifier: Arc<dyn Notifier>,
    /// When false, notification effects are dropped
    pub notifications_enabled: bool,
}

impl OccupancyEnvironment {
    /// Creates an environment with notifications enabled
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            clock,
            notifier,
            notifications_enabled: true,
        }
    }

    /// Turns notification effects on or off
    #[must_use]
    pub const fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Describes a best-effort notification. Failures are logged and counted
    /// when the effect runs.
    #[must_use]
    pub fn notify(&self, recipient: &str, kind: NotificationKind, payload: serde_json::Value) -> Effect {
        if !self.notifications_enabled {
            return Effect::None;
        }

        let notifier = Arc::clone(&self.notifier);
        let recipient = recipient.to_string();
        Effect::future(async move {
            if let Err(error) = notifier.notify(&recipient, kind, payload).await {
                tracing::warn!(%recipient, %kind, %error, "Notification failed");
                metrics::counter!(NOTIFICATION_FAILURES, "kind" => kind.to_string()).increment(1);
            }
        })
    }
}

impl std::fmt::Debug for OccupancyEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OccupancyEnvironment")
            .field("notifications_enabled", &self.notifications_enabled)
            .finish_non_exhaustive()
    }
}
