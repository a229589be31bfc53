use std::{collections::HashSet, net::SocketAddr};

use thiserror::Error;

use crate::monitor::ProcessRole;

use super::schema::{Config, TrendSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_seconds == 0 {
            return Err(ConfigError::Validation(
                "tick_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.analysis_interval_seconds == 0 {
            return Err(ConfigError::Validation(
                "analysis_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.history_capacity_per_role == 0 {
            return Err(ConfigError::Validation(
                "history_capacity_per_role must be greater than 0".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "read_timeout_ms must be greater than 0".to_string(),
            ));
        }

        self.trend.validate()?;

        let mut seen_roles = HashSet::new();
        for rule in &self.roles {
            if rule.role == ProcessRole::SystemTotal {
                return Err(ConfigError::Validation(
                    "roles: system_total is sampled from machine totals and takes no rule"
                        .to_string(),
                ));
            }
            if !seen_roles.insert(rule.role) {
                return Err(ConfigError::Validation(format!(
                    "roles: duplicate rule for {}",
                    rule.role
                )));
            }
            if rule.pattern.trim().is_empty() && rule.pid.is_none() {
                return Err(ConfigError::Validation(format!(
                    "roles: rule for {} needs a pattern or a pid",
                    rule.role
                )));
            }
        }

        if self.persistence.enabled && self.persistence.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "persistence.path must not be empty when persistence.enabled is true".to_string(),
            ));
        }
        if self.persistence.interval_seconds == 0 {
            return Err(ConfigError::Validation(
                "persistence.interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.api.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "api.bind is not a valid socket address: {}",
                self.api.bind
            )));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.api.default_resolution == 0 || self.api.max_resolution == 0 {
            return Err(ConfigError::Validation(
                "api.default_resolution and api.max_resolution must be greater than 0"
                    .to_string(),
            ));
        }
        if self.api.default_resolution > self.api.max_resolution {
            return Err(ConfigError::Validation(
                "api.default_resolution must not exceed api.max_resolution".to_string(),
            ));
        }

        if self.notifier.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "notifier.channel_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl TrendSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_minutes == 0 {
            return Err(ConfigError::Validation(
                "trend.window_minutes must be greater than 0".to_string(),
            ));
        }
        validate_rate("trend.stable_band_mb_per_hour", self.stable_band_mb_per_hour)?;
        validate_rate(
            "trend.alert_threshold_mb_per_hour",
            self.alert_threshold_mb_per_hour,
        )?;
        validate_rate(
            "trend.clear_threshold_mb_per_hour",
            self.clear_threshold_mb_per_hour,
        )?;
        validate_rate(
            "trend.critical_threshold_mb_per_hour",
            self.critical_threshold_mb_per_hour,
        )?;
        if self.clear_threshold_mb_per_hour >= self.alert_threshold_mb_per_hour {
            return Err(ConfigError::Validation(
                "trend.clear_threshold_mb_per_hour must be lower than trend.alert_threshold_mb_per_hour"
                    .to_string(),
            ));
        }
        if self.critical_threshold_mb_per_hour < self.alert_threshold_mb_per_hour {
            return Err(ConfigError::Validation(
                "trend.critical_threshold_mb_per_hour must not be lower than trend.alert_threshold_mb_per_hour"
                    .to_string(),
            ));
        }
        if self.min_alert_samples == 0 {
            return Err(ConfigError::Validation(
                "trend.min_alert_samples must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_rate(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value.is_sign_negative() {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}
