mod alert_logic;
mod analyzer;
mod regression;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};

use crate::config::TrendSettings;
use crate::history::HistoryStore;
use crate::monitor::ProcessRole;

use alert_logic::AlertBook;
use analyzer::analyze;

pub use alert_logic::{AlertEvent, AlertTransition, Severity};
pub use analyzer::TrendRecord;

/// Why an analysis pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTrigger {
    Scheduled,
    /// Rerun with new thresholds: may clear active alerts, never advances a streak.
    ConfigReload,
}

/// Trend computation over the history store plus the alert bookkeeping that
/// survives between analysis ticks.
#[derive(Debug)]
pub struct TrendAnalyzer {
    alerts: RwLock<AlertBook>,
    /// Newest sample timestamp each role's streak last counted.
    observed: Mutex<BTreeMap<ProcessRole, DateTime<Utc>>>,
    max_sample_age: Duration,
}

impl TrendAnalyzer {
    /// A role whose newest sample is older than `max_sample_age` at analysis
    /// time is treated as having no data.
    pub fn new(max_sample_age: Duration) -> Self {
        Self {
            alerts: RwLock::default(),
            observed: Mutex::default(),
            max_sample_age,
        }
    }

    /// Recomputed from the store on every call; nothing is cached.
    pub fn trend_for(
        &self,
        store: &HistoryStore,
        role: ProcessRole,
        settings: &TrendSettings,
    ) -> TrendRecord {
        let window = store.latest_window(role, window_duration(settings));
        analyze(role, &window, settings)
    }

    pub fn trends(&self, store: &HistoryStore, settings: &TrendSettings) -> Vec<TrendRecord> {
        ProcessRole::ALL
            .into_iter()
            .map(|role| self.trend_for(store, role, settings))
            .collect()
    }

    /// One analysis pass: recompute trends for the application roles and feed
    /// their rates through the alert hysteresis.
    ///
    /// A window counts toward a streak once. Passes that find no newer sample
    /// leave the alert state alone, and stale data resets a pending streak.
    pub fn run_tick(
        &self,
        store: &HistoryStore,
        settings: &TrendSettings,
        now: DateTime<Utc>,
        trigger: AnalysisTrigger,
    ) -> Vec<(TrendRecord, AlertTransition)> {
        let records = ProcessRole::ALL
            .into_iter()
            .filter(|role| role.is_application())
            .map(|role| self.trend_for(store, role, settings))
            .collect::<Vec<_>>();

        let mut alerts = self.alerts.write();
        let mut observed = self.observed.lock();
        records
            .into_iter()
            .map(|record| {
                let role = record.process_role;
                let fresh = record
                    .window_end
                    .filter(|newest| now.signed_duration_since(*newest) <= self.max_sample_age);

                let transition = match (trigger, fresh) {
                    (_, None) => alerts.observe(role, None, settings, now),
                    (AnalysisTrigger::ConfigReload, Some(_)) if !alerts.has_active(role) => {
                        AlertTransition::None
                    }
                    (AnalysisTrigger::ConfigReload, Some(_)) => {
                        alerts.observe(role, record.growth_rate_mb_per_hour, settings, now)
                    }
                    (AnalysisTrigger::Scheduled, Some(newest)) => {
                        if observed.get(&role) == Some(&newest) {
                            AlertTransition::None
                        } else {
                            observed.insert(role, newest);
                            alerts.observe(role, record.growth_rate_mb_per_hour, settings, now)
                        }
                    }
                };
                (record, transition)
            })
            .collect()
    }

    pub fn active_alerts(&self) -> Vec<AlertEvent> {
        self.alerts.read().active_alerts()
    }

    pub fn raised_total(&self) -> u64 {
        self.alerts.read().raised_total()
    }
}

fn window_duration(settings: &TrendSettings) -> Duration {
    i64::try_from(settings.window_minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests;
