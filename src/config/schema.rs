use serde::Deserialize;

use crate::monitor::ProcessRole;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,
    #[serde(default = "default_analysis_interval_seconds")]
    pub analysis_interval_seconds: u64,
    #[serde(default = "default_history_capacity_per_role")]
    pub history_capacity_per_role: usize,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_track_system_total")]
    pub track_system_total: bool,
    #[serde(default)]
    pub trend: TrendSettings,
    #[serde(default = "default_roles")]
    pub roles: Vec<RoleRule>,
    #[serde(default)]
    pub persistence: Persistence,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub notifier: NotifierSettings,
    #[serde(default)]
    pub simulation: Simulation,
}

/// Subset of the config that can change while the process runs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub trend: TrendSettings,
    pub notifier: NotifierSettings,
}

impl RuntimeConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            trend: config.trend.clone(),
            notifier: config.notifier.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendSettings {
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,
    #[serde(default = "default_stable_band_mb_per_hour")]
    pub stable_band_mb_per_hour: f64,
    #[serde(default = "default_alert_threshold_mb_per_hour")]
    pub alert_threshold_mb_per_hour: f64,
    #[serde(default = "default_clear_threshold_mb_per_hour")]
    pub clear_threshold_mb_per_hour: f64,
    #[serde(default = "default_critical_threshold_mb_per_hour")]
    pub critical_threshold_mb_per_hour: f64,
    #[serde(default = "default_min_alert_samples")]
    pub min_alert_samples: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRule {
    pub role: ProcessRole,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Persistence {
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    #[serde(default = "default_persistence_path")]
    pub path: String,
    #[serde(default = "default_persistence_interval_seconds")]
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub idle_shutdown_secs: u64,
    #[serde(default = "default_resolution")]
    pub default_resolution: usize,
    #[serde(default = "default_max_resolution")]
    pub max_resolution: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierSettings {
    #[serde(default = "default_notify_resolved")]
    pub notify_resolved: bool,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Simulation {
    #[serde(default)]
    pub enabled: bool,
}
