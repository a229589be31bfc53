use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, Notify, RwLock};

use crate::{
    config::{Config, RuntimeConfig},
    history::HistoryStore,
    notifier::AlertNotifier,
    shutdown::ShutdownSignal,
    trend::TrendAnalyzer,
};

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub config_path: String,
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub runtime_update_notify: Arc<Notify>,
    pub history: Arc<HistoryStore>,
    pub analyzer: Arc<TrendAnalyzer>,
    pub notifier: AlertNotifier,
    pub last_sampler_tick: Arc<Mutex<Option<DateTime<Utc>>>>,
    pub last_analysis_tick: Arc<Mutex<Option<DateTime<Utc>>>>,
    pub started_at: DateTime<Utc>,
    pub shutdown: ShutdownSignal,
}

impl AppContext {
    pub fn new(config: Config, config_path: impl Into<String>, shutdown: ShutdownSignal) -> Self {
        let runtime_config = RuntimeConfig::from_config(&config);
        let notifier = AlertNotifier::new(runtime_config.notifier.channel_capacity);
        let history = HistoryStore::new(config.history_capacity_per_role);
        // newer data than this always exists while the sampler is keeping up
        let max_sample_age_secs = config
            .analysis_interval_seconds
            .max(config.tick_interval_seconds.saturating_mul(2));
        let max_sample_age = i64::try_from(max_sample_age_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            config,
            config_path: config_path.into(),
            runtime_config: Arc::new(RwLock::new(runtime_config)),
            runtime_update_notify: Arc::new(Notify::new()),
            history: Arc::new(history),
            analyzer: Arc::new(TrendAnalyzer::new(max_sample_age)),
            notifier,
            last_sampler_tick: Arc::new(Mutex::new(None)),
            last_analysis_tick: Arc::new(Mutex::new(None)),
            started_at: Utc::now(),
            shutdown,
        }
    }

    pub async fn update_runtime_config(&self, runtime_config: RuntimeConfig) {
        {
            let mut current = self.runtime_config.write().await;
            *current = runtime_config;
        }
        self.runtime_update_notify.notify_waiters();
    }
}
