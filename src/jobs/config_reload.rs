use std::path::Path;

use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::task::JoinHandle;

use crate::app_context::AppContext;
use crate::config::{RuntimeConfig, load_config};

/// Only `[trend]` and `[notifier]` take effect without a restart.
async fn apply_runtime_reload_from_path(
    app_context: &AppContext,
    config_path: &str,
) -> Result<RuntimeConfig, String> {
    let new_config = load_config(config_path).map_err(|error| error.to_string())?;
    let runtime_config = RuntimeConfig::from_config(&new_config);
    app_context.update_runtime_config(runtime_config.clone()).await;
    Ok(runtime_config)
}

pub(super) fn start_config_hot_reload_job(app_context: AppContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let config_path = app_context.config_path.clone();
        let mut shutdown = app_context.shutdown.clone();
        let mut watcher = match RecommendedWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            NotifyConfig::default(),
        ) {
            Ok(watcher) => watcher,
            Err(error) => {
                log::warn!("config_hot_reload_disabled reason=watcher_init_failed error={}", error);
                return;
            }
        };

        if let Err(error) = watcher.watch(Path::new(config_path.as_str()), RecursiveMode::NonRecursive)
        {
            log::warn!(
                "config_hot_reload_disabled reason=watch_failed path={} error={}",
                config_path,
                error
            );
            return;
        }

        loop {
            let event_result = tokio::select! {
                received = rx.recv() => match received {
                    Some(event_result) => event_result,
                    None => break,
                },
                _ = shutdown.wait() => break,
            };

            let event = match event_result {
                Ok(event) => event,
                Err(error) => {
                    log::warn!("config_hot_reload_event_error error={}", error);
                    continue;
                }
            };

            let should_reload = matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
            );
            if !should_reload {
                continue;
            }

            match apply_runtime_reload_from_path(&app_context, config_path.as_str()).await {
                Ok(runtime_config) => {
                    let trend = runtime_config.trend;
                    log::info!(
                        "config_hot_reload_applied target=runtime window_minutes={} stable_band_mb_per_hour={} alert_threshold_mb_per_hour={} clear_threshold_mb_per_hour={} critical_threshold_mb_per_hour={} min_alert_samples={} notify_resolved={}",
                        trend.window_minutes,
                        trend.stable_band_mb_per_hour,
                        trend.alert_threshold_mb_per_hour,
                        trend.clear_threshold_mb_per_hour,
                        trend.critical_threshold_mb_per_hour,
                        trend.min_alert_samples,
                        runtime_config.notifier.notify_resolved,
                    );
                }
                Err(error) => {
                    log::warn!("config_hot_reload_rejected error={}", error);
                }
            }
        }

        drop(watcher);
        log::info!("config_hot_reload_stopped");
    })
}

#[cfg(test)]
mod tests;
