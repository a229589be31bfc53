use std::time::Duration;

use chrono::Utc;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::app_context::AppContext;
use crate::trend::{AlertTransition, AnalysisTrigger};

pub(super) fn start_analysis_job(app_context: AppContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shutdown = app_context.shutdown.clone();
        let mut ticker =
            tokio::time::interval(Duration::from_secs(app_context.config.analysis_interval_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick fires immediately and would only see an empty store
        ticker.tick().await;

        loop {
            let trigger = tokio::select! {
                _ = ticker.tick() => AnalysisTrigger::Scheduled,
                _ = app_context.runtime_update_notify.notified() => {
                    log::info!("analysis_rerun_after_config_reload");
                    AnalysisTrigger::ConfigReload
                }
                _ = shutdown.wait() => break,
            };

            run_analysis_tick(&app_context, trigger).await;
        }

        log::info!("analysis_job_stopped");
    })
}

pub(super) async fn run_analysis_tick(app_context: &AppContext, trigger: AnalysisTrigger) -> usize {
    let runtime_config = app_context.runtime_config.read().await.clone();
    let now = Utc::now();

    let results = app_context
        .analyzer
        .run_tick(&app_context.history, &runtime_config.trend, now, trigger);

    let mut notified = 0;
    for (record, transition) in &results {
        tracing::info!(
            target: "trend",
            module = "trend",
            role = %record.process_role,
            growth_rate_mb_per_hour = record.growth_rate_mb_per_hour,
            classification = ?record.classification,
            sample_count = record.sample_count,
            latest_rss_bytes = record.latest_rss_bytes,
            "trend_evaluated"
        );

        match transition {
            AlertTransition::None => continue,
            AlertTransition::Raised(event) => {
                log::warn!(
                    "memory_alert_raised role={} growth_rate_mb_per_hour={:.3} severity={:?}",
                    event.process_role,
                    event.growth_rate_mb_per_hour,
                    event.severity
                );
            }
            AlertTransition::Cleared {
                event,
                growth_rate_mb_per_hour,
                ..
            } => {
                log::info!(
                    "memory_alert_cleared role={} growth_rate_mb_per_hour={:.3} raised_at={}",
                    event.process_role,
                    growth_rate_mb_per_hour,
                    event.triggered_at.to_rfc3339()
                );
            }
        }

        if app_context
            .notifier
            .publish(transition, runtime_config.notifier.notify_resolved)
            .is_some()
        {
            notified += 1;
        }
    }

    let mut tick = app_context.last_analysis_tick.lock().await;
    *tick = Some(now);
    notified
}
