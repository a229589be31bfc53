use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitor::{ProcessRole, Sample};
use crate::trend::{AlertEvent, TrendRecord};

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub generated_at: DateTime<Utc>,
    /// Every role is present; `null` means the role never reported.
    pub roles: BTreeMap<ProcessRole, Option<Sample>>,
    pub totals: ApplicationTotals,
}

/// Sum over the application roles that have reported at least once.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ApplicationTotals {
    pub rss_bytes: u64,
    pub vms_bytes: u64,
    pub cpu_percent: f64,
    pub thread_count: u64,
    pub reporting_roles: usize,
}

impl ApplicationTotals {
    pub fn from_latest<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Self {
        samples
            .into_iter()
            .filter(|sample| sample.process_role.is_application())
            .fold(Self::default(), |totals, sample| Self {
                rss_bytes: totals.rss_bytes.saturating_add(sample.rss_bytes),
                vms_bytes: totals.vms_bytes.saturating_add(sample.vms_bytes),
                cpu_percent: totals.cpu_percent + sample.cpu_percent,
                thread_count: totals.thread_count + u64::from(sample.thread_count),
                reporting_roles: totals.reporting_roles + 1,
            })
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub process_role: ProcessRole,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub resolution: usize,
    /// Matching samples before downsampling.
    pub total_samples: usize,
    pub stride: usize,
    pub downsampling: &'static str,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub generated_at: DateTime<Utc>,
    pub window_minutes: u64,
    pub trends: Vec<TrendRecord>,
    pub active_alerts: Vec<AlertEvent>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub last_sampler_tick: Option<DateTime<Utc>>,
    pub last_analysis_tick: Option<DateTime<Utc>>,
    pub samples_per_role: BTreeMap<ProcessRole, usize>,
    pub history_capacity_per_role: usize,
    pub active_alerts: usize,
    pub raised_alerts_total: u64,
    pub simulation: bool,
}
