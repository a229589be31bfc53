use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

use crate::app_context::AppContext;
use crate::notifier::NotificationKind;

/// Default subscriber: every notification becomes a structured log line.
pub(super) fn start_notification_log_job(app_context: AppContext) -> JoinHandle<()> {
    let mut receiver = app_context.notifier.subscribe();
    let mut shutdown = app_context.shutdown.clone();

    tokio::spawn(async move {
        loop {
            let notification = tokio::select! {
                received = receiver.recv() => received,
                _ = shutdown.wait() => break,
            };

            match notification {
                Ok(notification) => {
                    let kind = match notification.kind {
                        NotificationKind::Raised => "raised",
                        NotificationKind::Resolved => "resolved",
                    };
                    tracing::warn!(
                        target: "notifier",
                        module = "notifier",
                        role = %notification.process_role,
                        kind,
                        severity = ?notification.severity,
                        growth_rate_mb_per_hour = notification.growth_rate_mb_per_hour,
                        timestamp = %notification.timestamp.to_rfc3339(),
                        message = %notification.message,
                        "alert_notification"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("alert_notifications_lagged skipped={}", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }

        log::info!("notification_job_stopped");
    })
}
