use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::app_context::AppContext;
use crate::monitor::{ProcessProbe, Sampler, SamplerOptions};

pub(super) fn start_sampler_job<P: ProcessProbe>(app_context: AppContext, probe: Arc<P>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let config = &app_context.config;
        let tick_interval = Duration::from_secs(config.tick_interval_seconds);
        let mut sampler = Sampler::new(
            probe,
            config.roles.clone(),
            SamplerOptions {
                read_timeout: Duration::from_millis(config.read_timeout_ms),
                track_system_total: config.track_system_total,
                self_pid: std::process::id(),
            },
        );

        let mut shutdown = app_context.shutdown.clone();
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous_tick = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait() => break,
            }

            let now = Utc::now();
            if let Some(previous) = previous_tick {
                let elapsed_secs = now.signed_duration_since(previous).num_seconds().max(0);
                let threshold_secs = (config.tick_interval_seconds * 2) as i64;
                if elapsed_secs > threshold_secs {
                    log::warn!(
                        "sampler_loop_delayed elapsed_secs={} threshold_secs={}",
                        elapsed_secs,
                        threshold_secs
                    );
                }
            }
            previous_tick = Some(now);

            let report = sampler.tick(&app_context.history, now).await;
            if report.recorded.is_empty() {
                log::debug!(
                    "sampler_tick_recorded_nothing failed={} unresolved={}",
                    report.failed.len(),
                    report.unresolved.len()
                );
            }

            let mut tick = app_context.last_sampler_tick.lock().await;
            *tick = Some(now);
        }

        log::info!("sampler_job_stopped");
    })
}
