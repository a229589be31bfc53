use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical identity of a tracked process. History is keyed by role, never by PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    Menubar,
    BackgroundService,
    SystemTotal,
}

impl ProcessRole {
    pub const COUNT: usize = 3;
    pub const ALL: [ProcessRole; Self::COUNT] = [
        ProcessRole::Menubar,
        ProcessRole::BackgroundService,
        ProcessRole::SystemTotal,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "menubar" => Some(Self::Menubar),
            "background_service" => Some(Self::BackgroundService),
            "system_total" => Some(Self::SystemTotal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Menubar => "menubar",
            Self::BackgroundService => "background_service",
            Self::SystemTotal => "system_total",
        }
    }

    /// Application roles are the ones matched to a real process.
    pub fn is_application(self) -> bool {
        !matches!(self, Self::SystemTotal)
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub process_role: ProcessRole,
    pub pid: u32,
    pub rss_bytes: u64,
    pub vms_bytes: u64,
    pub cpu_percent: f64,
    pub thread_count: u32,
}

/// Raw reading for one process (or the whole machine) before it is tied to a role and tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessMetrics {
    pub pid: u32,
    pub rss_bytes: u64,
    pub vms_bytes: u64,
    pub cpu_percent: f64,
    pub thread_count: u32,
}

impl ProcessMetrics {
    pub fn into_sample(self, role: ProcessRole, timestamp: DateTime<Utc>) -> Sample {
        Sample {
            timestamp,
            process_role: role,
            pid: self.pid,
            rss_bytes: self.rss_bytes,
            vms_bytes: self.vms_bytes,
            cpu_percent: self.cpu_percent,
            thread_count: self.thread_count,
        }
    }
}
