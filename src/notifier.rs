//! Fan-out of alert transitions to in-process subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::monitor::ProcessRole;
use crate::trend::{AlertTransition, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Raised,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    pub process_role: ProcessRole,
    pub kind: NotificationKind,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub growth_rate_mb_per_hour: f64,
}

#[derive(Clone)]
pub struct AlertNotifier {
    sender: broadcast::Sender<AlertNotification>,
}

impl AlertNotifier {
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertNotification> {
        self.sender.subscribe()
    }

    /// Turn a transition into a notification and broadcast it. Returns what was
    /// sent, if anything. Having no subscribers is not an error.
    pub fn publish(&self, transition: &AlertTransition, notify_resolved: bool) -> Option<AlertNotification> {
        let notification = build_notification(transition, notify_resolved)?;

        if self.sender.send(notification.clone()).is_err() {
            log::debug!(
                "alert_notification_unobserved role={} kind={:?}",
                notification.process_role,
                notification.kind
            );
        }

        Some(notification)
    }
}

fn build_notification(transition: &AlertTransition, notify_resolved: bool) -> Option<AlertNotification> {
    match transition {
        AlertTransition::None => None,
        AlertTransition::Raised(event) => Some(AlertNotification {
            process_role: event.process_role,
            kind: NotificationKind::Raised,
            severity: event.severity,
            message: format!(
                "{} memory rising at {:.2} MB/h ({})",
                event.process_role,
                event.growth_rate_mb_per_hour,
                severity_label(event.severity)
            ),
            timestamp: event.triggered_at,
            growth_rate_mb_per_hour: event.growth_rate_mb_per_hour,
        }),
        AlertTransition::Cleared {
            event,
            cleared_at,
            growth_rate_mb_per_hour,
        } if notify_resolved => Some(AlertNotification {
            process_role: event.process_role,
            kind: NotificationKind::Resolved,
            severity: event.severity,
            message: format!(
                "{} memory growth back to {:.2} MB/h, alert from {} resolved",
                event.process_role,
                growth_rate_mb_per_hour,
                event.triggered_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            timestamp: *cleared_at,
            growth_rate_mb_per_hour: *growth_rate_mb_per_hour,
        }),
        AlertTransition::Cleared { .. } => None,
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "warning",
        Severity::Critical => "critical",
    }
}
