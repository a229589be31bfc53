mod api;
mod app_context;
mod config;
mod history;
mod jobs;
mod monitor;
mod notifier;
mod shutdown;
mod trend;

use std::{path::PathBuf, sync::Arc, time::Duration};

use tracing_subscriber::EnvFilter;

use crate::app_context::AppContext;
use crate::config::{Config, load_config_or_default};
use crate::jobs::{persist_history, start_background_jobs};
use crate::monitor::ActiveProbe;
use crate::shutdown::shutdown_channel;

fn init_json_logging() {
    if let Err(error) = tracing_log::LogTracer::init() {
        eprintln!(
            "logging bridge initialization failed (continuing with existing logger): {}",
            error
        );
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "MEMTREND_CONFIG";
const JOB_STOP_TIMEOUT: Duration = Duration::from_secs(10);

async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            log::warn!("signal_handler_failed signal=ctrl_c error={}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                log::warn!("signal_handler_failed signal=sigterm error={}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("shutdown_requested signal=ctrl_c"),
        _ = terminate => log::info!("shutdown_requested signal=sigterm"),
    }
}

fn log_startup(config: &Config, config_path: &str) {
    log::info!(
        "memtrend_starting config_path={} tick_interval_seconds={} analysis_interval_seconds={} history_capacity_per_role={} roles={} api_enabled={} persistence_enabled={}",
        config_path,
        config.tick_interval_seconds,
        config.analysis_interval_seconds,
        config.history_capacity_per_role,
        config.roles.len(),
        config.api.enabled,
        config.persistence.enabled
    );

    if config.simulation.enabled {
        log::warn!("simulation_mode_enabled source=process_probe");
    }
}

#[tokio::main]
async fn main() {
    init_json_logging();

    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config_or_default(&config_path) {
        Ok(config) => config,
        Err(error) => {
            log::error!("config_invalid path={} error={}", config_path, error);
            return;
        }
    };
    log_startup(&config, &config_path);

    let (trigger, signal) = shutdown_channel();
    let app_context = AppContext::new(config.clone(), config_path, signal);

    let history_path = PathBuf::from(&config.persistence.path);
    if config.persistence.enabled {
        let history = Arc::clone(&app_context.history);
        let path = history_path.clone();
        match tokio::task::spawn_blocking(move || history.load(&path)).await {
            Ok(restored) => log::info!("history_restore_finished samples={}", restored),
            Err(error) => log::warn!("history_load_degraded reason=task_failed error={}", error),
        }
    }

    let probe = Arc::new(ActiveProbe::new(config.simulation.enabled));
    let mut handles = start_background_jobs(app_context.clone(), probe);

    if config.api.enabled {
        let api_context = app_context.clone();
        let api_signal = trigger.signal();
        handles.push(tokio::spawn(async move {
            if let Err(error) = api::serve(api_context, api_signal).await {
                log::error!("api_failed error={}", error);
            }
        }));
    }

    wait_for_termination().await;
    trigger.trigger();

    for handle in handles {
        match tokio::time::timeout(JOB_STOP_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => log::error!("job_failed error={}", error),
            Err(_) => log::warn!("job_stop_timeout timeout_secs={}", JOB_STOP_TIMEOUT.as_secs()),
        }
    }

    if config.persistence.enabled {
        persist_history(Arc::clone(&app_context.history), history_path).await;
    }

    log::info!("memtrend_stopped");
}
