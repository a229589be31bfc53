use crate::monitor::ProcessRole;

use super::schema::{
    Api, Config, NotifierSettings, Persistence, RoleRule, Simulation, TrendSettings,
};

pub(super) fn default_tick_interval_seconds() -> u64 {
    2
}

pub(super) fn default_analysis_interval_seconds() -> u64 {
    30
}

pub(super) fn default_history_capacity_per_role() -> usize {
    3600
}

pub(super) fn default_read_timeout_ms() -> u64 {
    1500
}

pub(super) fn default_track_system_total() -> bool {
    true
}

pub(super) fn default_window_minutes() -> u64 {
    30
}

pub(super) fn default_stable_band_mb_per_hour() -> f64 {
    1.0
}

pub(super) fn default_alert_threshold_mb_per_hour() -> f64 {
    5.0
}

pub(super) fn default_clear_threshold_mb_per_hour() -> f64 {
    2.0
}

pub(super) fn default_critical_threshold_mb_per_hour() -> f64 {
    20.0
}

pub(super) fn default_min_alert_samples() -> u32 {
    3
}

pub(super) fn default_roles() -> Vec<RoleRule> {
    vec![
        RoleRule {
            role: ProcessRole::Menubar,
            pattern: "clipboard_menubar".to_string(),
            pid: None,
        },
        RoleRule {
            role: ProcessRole::BackgroundService,
            pattern: "clipboard_service".to_string(),
            pid: None,
        },
    ]
}

pub(super) fn default_persistence_enabled() -> bool {
    true
}

pub(super) fn default_persistence_path() -> String {
    "data/memory_history.json".to_string()
}

pub(super) fn default_persistence_interval_seconds() -> u64 {
    60
}

pub(super) fn default_api_enabled() -> bool {
    true
}

pub(super) fn default_api_bind() -> String {
    "127.0.0.1:8765".to_string()
}

pub(super) fn default_request_timeout_secs() -> u64 {
    10
}

pub(super) fn default_resolution() -> usize {
    600
}

pub(super) fn default_max_resolution() -> usize {
    5000
}

pub(super) fn default_notify_resolved() -> bool {
    true
}

pub(super) fn default_channel_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval_seconds(),
            analysis_interval_seconds: default_analysis_interval_seconds(),
            history_capacity_per_role: default_history_capacity_per_role(),
            read_timeout_ms: default_read_timeout_ms(),
            track_system_total: default_track_system_total(),
            trend: TrendSettings::default(),
            roles: default_roles(),
            persistence: Persistence::default(),
            api: Api::default(),
            notifier: NotifierSettings::default(),
            simulation: Simulation::default(),
        }
    }
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            stable_band_mb_per_hour: default_stable_band_mb_per_hour(),
            alert_threshold_mb_per_hour: default_alert_threshold_mb_per_hour(),
            clear_threshold_mb_per_hour: default_clear_threshold_mb_per_hour(),
            critical_threshold_mb_per_hour: default_critical_threshold_mb_per_hour(),
            min_alert_samples: default_min_alert_samples(),
        }
    }
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            path: default_persistence_path(),
            interval_seconds: default_persistence_interval_seconds(),
        }
    }
}

impl Default for Api {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            bind: default_api_bind(),
            request_timeout_secs: default_request_timeout_secs(),
            idle_shutdown_secs: 0,
            default_resolution: default_resolution(),
            max_resolution: default_max_resolution(),
        }
    }
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            notify_resolved: default_notify_resolved(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
