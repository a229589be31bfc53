use std::fs;

use tempfile::tempdir;

use crate::{
    app_context::AppContext,
    config::{RuntimeConfig, load_config},
    shutdown::shutdown_channel,
};

use super::apply_runtime_reload_from_path;

fn config_toml(alert: f64, clear: f64, notify_resolved: bool) -> String {
    format!(
        r#"tick_interval_seconds = 2
analysis_interval_seconds = 30

[trend]
window_minutes = 30
stable_band_mb_per_hour = 1.0
alert_threshold_mb_per_hour = {alert:?}
clear_threshold_mb_per_hour = {clear:?}
critical_threshold_mb_per_hour = 50.0
min_alert_samples = 3

[[roles]]
role = "background_service"
pattern = "clipboard_service"

[notifier]
notify_resolved = {notify_resolved}
"#
    )
}

#[tokio::test]
async fn hot_reload_applies_valid_runtime_changes_without_restart() {
    let temp = tempdir().expect("tempdir should be created");
    let config_path = temp.path().join("config.toml");
    fs::write(&config_path, config_toml(5.0, 2.0, true)).expect("initial config should be written");

    let initial = load_config(&config_path).expect("initial config should load");
    let (_trigger, signal) = shutdown_channel();
    let app = AppContext::new(initial, config_path.to_string_lossy(), signal);

    fs::write(&config_path, config_toml(12.5, 4.0, false)).expect("updated config should be written");

    let applied = apply_runtime_reload_from_path(&app, &config_path.to_string_lossy())
        .await
        .expect("valid hot-reload should apply");

    let current = app.runtime_config.read().await.clone();
    assert!((applied.trend.alert_threshold_mb_per_hour - 12.5).abs() < f64::EPSILON);
    assert!((current.trend.alert_threshold_mb_per_hour - 12.5).abs() < f64::EPSILON);
    assert!((current.trend.clear_threshold_mb_per_hour - 4.0).abs() < f64::EPSILON);
    assert!(!current.notifier.notify_resolved);
}

#[tokio::test]
async fn hot_reload_rejects_invalid_config_and_preserves_last_runtime() {
    let temp = tempdir().expect("tempdir should be created");
    let config_path = temp.path().join("config.toml");
    fs::write(&config_path, config_toml(5.0, 2.0, true)).expect("initial config should be written");

    let initial = load_config(&config_path).expect("initial config should load");
    let expected_runtime = RuntimeConfig::from_config(&initial);
    let (_trigger, signal) = shutdown_channel();
    let app = AppContext::new(initial, config_path.to_string_lossy(), signal);

    // clear above alert would let an alert flap
    fs::write(&config_path, config_toml(5.0, 6.0, false)).expect("invalid config should be written");

    let error = apply_runtime_reload_from_path(&app, &config_path.to_string_lossy())
        .await
        .expect_err("invalid config should be rejected");
    assert!(error.contains("clear_threshold_mb_per_hour must be lower"));

    let current = app.runtime_config.read().await.clone();
    assert!(
        (current.trend.clear_threshold_mb_per_hour
            - expected_runtime.trend.clear_threshold_mb_per_hour)
            .abs()
            < f64::EPSILON
    );
    assert_eq!(
        current.notifier.notify_resolved,
        expected_runtime.notifier.notify_resolved
    );
}
