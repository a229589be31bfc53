mod defaults;
mod io;
mod schema;
mod validate;

pub use io::{load_config, load_config_or_default};
pub use schema::{
    Api, Config, NotifierSettings, Persistence, RoleRule, RuntimeConfig, Simulation,
    TrendSettings,
};
pub use validate::ConfigError;

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use crate::monitor::ProcessRole;

    use super::{Config, ConfigError, load_config, load_config_or_default};

    const FULL_CONFIG: &str = r#"
tick_interval_seconds = 5
analysis_interval_seconds = 15
history_capacity_per_role = 100
read_timeout_ms = 500
track_system_total = false

[trend]
window_minutes = 45
stable_band_mb_per_hour = 0.5
alert_threshold_mb_per_hour = 8.0
clear_threshold_mb_per_hour = 3.0
critical_threshold_mb_per_hour = 40.0
min_alert_samples = 4

[[roles]]
role = "menubar"
pattern = "ClipboardMenu.app"

[[roles]]
role = "background_service"
pid = 4242

[persistence]
enabled = true
path = "state/history.json"
interval_seconds = 45

[api]
bind = "0.0.0.0:9000"
request_timeout_secs = 3
idle_shutdown_secs = 600
default_resolution = 100
max_resolution = 1000

[notifier]
notify_resolved = false
"#;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.tick_interval_seconds, 2);
        assert_eq!(config.history_capacity_per_role, 3600);
        assert_eq!(config.trend.min_alert_samples, 3);
        assert!(config.trend.clear_threshold_mb_per_hour < config.trend.alert_threshold_mb_per_hour);
        assert_eq!(config.roles.len(), 2);
    }

    #[test]
    fn parses_full_file() {
        let temp = tempdir().expect("tempdir should be created");
        let path = temp.path().join("config.toml");
        fs::write(&path, FULL_CONFIG).expect("config should be written");

        let config = load_config(&path).expect("config should load");
        assert_eq!(config.tick_interval_seconds, 5);
        assert!(!config.track_system_total);
        assert_eq!(config.trend.window_minutes, 45);
        assert_eq!(config.trend.min_alert_samples, 4);
        assert_eq!(config.roles[0].role, ProcessRole::Menubar);
        assert_eq!(config.roles[1].pid, Some(4242));
        assert_eq!(config.api.idle_shutdown_secs, 600);
        assert!(!config.notifier.notify_resolved);
        assert_eq!(config.notifier.channel_capacity, 64);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let temp = tempdir().expect("tempdir should be created");
        let path = temp.path().join("config.toml");
        fs::write(&path, "").expect("config should be written");

        let config = load_config(&path).expect("empty config should load");
        assert_eq!(config.analysis_interval_seconds, 30);
        assert_eq!(config.api.bind, "127.0.0.1:8765");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let temp = tempdir().expect("tempdir should be created");
        let config = load_config_or_default(temp.path().join("absent.toml"))
            .expect("missing file should give defaults");
        assert_eq!(config.tick_interval_seconds, 2);
    }

    #[test]
    fn rejects_clear_threshold_above_alert_threshold() {
        let mut config = Config::default();
        config.trend.clear_threshold_mb_per_hour = config.trend.alert_threshold_mb_per_hour;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_bad_roles_and_bind() {
        let temp = tempdir().expect("tempdir should be created");
        let path = temp.path().join("config.toml");

        fs::write(&path, "[[roles]]\nrole = \"system_total\"\npattern = \"x\"\n")
            .expect("config should be written");
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));

        fs::write(&path, "[[roles]]\nrole = \"menubar\"\n").expect("config should be written");
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));

        fs::write(&path, "[[roles]]\nrole = \"dock\"\npattern = \"x\"\n")
            .expect("config should be written");
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, "[api]\nbind = \"localhost\"\n").expect("config should be written");
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_intervals() {
        let mut config = Config::default();
        config.tick_interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.trend.min_alert_samples = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.default_resolution = config.api.max_resolution + 1;
        assert!(config.validate().is_err());
    }
}
