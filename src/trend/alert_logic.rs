use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TrendSettings;
use crate::monitor::ProcessRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub process_role: ProcessRole,
    pub triggered_at: DateTime<Utc>,
    pub growth_rate_mb_per_hour: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertTransition {
    None,
    Raised(AlertEvent),
    Cleared {
        event: AlertEvent,
        cleared_at: DateTime<Utc>,
        growth_rate_mb_per_hour: f64,
    },
}

#[derive(Debug, Default)]
struct RoleAlertState {
    consecutive_over: u32,
    active: Option<AlertEvent>,
}

/// One active alert at most per role, with a streak requirement to raise and a
/// lower threshold to clear.
#[derive(Debug, Default)]
pub struct AlertBook {
    states: BTreeMap<ProcessRole, RoleAlertState>,
    raised_total: u64,
}

impl AlertBook {
    pub fn observe(
        &mut self,
        role: ProcessRole,
        rate: Option<f64>,
        settings: &TrendSettings,
        now: DateTime<Utc>,
    ) -> AlertTransition {
        let state = self.states.entry(role).or_default();
        let transition = next_transition(state, role, rate, settings, now);
        if matches!(transition, AlertTransition::Raised(_)) {
            self.raised_total += 1;
        }
        transition
    }

    pub fn has_active(&self, role: ProcessRole) -> bool {
        self.states
            .get(&role)
            .is_some_and(|state| state.active.is_some())
    }

    pub fn active_alerts(&self) -> Vec<AlertEvent> {
        self.states
            .values()
            .filter_map(|state| state.active.clone())
            .collect()
    }

    pub fn raised_total(&self) -> u64 {
        self.raised_total
    }
}

fn next_transition(
    state: &mut RoleAlertState,
    role: ProcessRole,
    rate: Option<f64>,
    settings: &TrendSettings,
    now: DateTime<Utc>,
) -> AlertTransition {
    if state.active.is_some() {
        // no data keeps the alert up until a real measurement says otherwise
        let Some(rate) = rate else {
            return AlertTransition::None;
        };
        if rate < settings.clear_threshold_mb_per_hour
            && let Some(event) = state.active.take()
        {
            state.consecutive_over = 0;
            return AlertTransition::Cleared {
                event,
                cleared_at: now,
                growth_rate_mb_per_hour: rate,
            };
        }
        return AlertTransition::None;
    }

    match rate {
        Some(rate) if rate > settings.alert_threshold_mb_per_hour => {
            state.consecutive_over = state.consecutive_over.saturating_add(1);
            if state.consecutive_over < settings.min_alert_samples {
                return AlertTransition::None;
            }

            state.consecutive_over = 0;
            let severity = if rate >= settings.critical_threshold_mb_per_hour {
                Severity::Critical
            } else {
                Severity::Warning
            };
            let event = AlertEvent {
                process_role: role,
                triggered_at: now,
                growth_rate_mb_per_hour: rate,
                severity,
            };
            state.active = Some(event.clone());
            AlertTransition::Raised(event)
        }
        _ => {
            state.consecutive_over = 0;
            AlertTransition::None
        }
    }
}
