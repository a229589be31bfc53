use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TrendSettings;
use crate::monitor::{ProcessRole, Sample};

use super::regression::rss_growth_mb_per_hour;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Stable,
    Rising,
    Falling,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRecord {
    pub process_role: ProcessRole,
    /// `None` when the window holds fewer than two distinct timestamps.
    pub growth_rate_mb_per_hour: Option<f64>,
    pub classification: Classification,
    pub peak_rss_bytes: Option<u64>,
    pub latest_rss_bytes: Option<u64>,
    pub sample_count: usize,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

/// `|rate| <= band` is stable; the band edge itself counts as stable.
pub fn classify(rate: Option<f64>, stable_band_mb_per_hour: f64) -> Classification {
    match rate {
        None => Classification::InsufficientData,
        Some(rate) if rate > stable_band_mb_per_hour => Classification::Rising,
        Some(rate) if rate < -stable_band_mb_per_hour => Classification::Falling,
        Some(_) => Classification::Stable,
    }
}

/// Fit a trend over `window`, which must be ordered oldest first.
pub fn analyze(role: ProcessRole, window: &[Sample], settings: &TrendSettings) -> TrendRecord {
    let growth_rate_mb_per_hour = rss_growth_mb_per_hour(window);

    TrendRecord {
        process_role: role,
        growth_rate_mb_per_hour,
        classification: classify(growth_rate_mb_per_hour, settings.stable_band_mb_per_hour),
        peak_rss_bytes: window.iter().map(|sample| sample.rss_bytes).max(),
        latest_rss_bytes: window.last().map(|sample| sample.rss_bytes),
        sample_count: window.len(),
        window_start: window.first().map(|sample| sample.timestamp),
        window_end: window.last().map(|sample| sample.timestamp),
    }
}
