use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::monitor::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Appended after dropping the oldest sample.
    Evicted,
    /// Timestamp was not after the newest stored sample; buffer untouched.
    Rejected,
}

/// Bounded, time-ordered samples for one role.
#[derive(Debug)]
pub struct RoleHistory {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl RoleHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) -> AppendOutcome {
        if let Some(last) = self.samples.back()
            && sample.timestamp <= last.timestamp
        {
            return AppendOutcome::Rejected;
        }

        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front();
            true
        } else {
            false
        };
        self.samples.push_back(sample);

        if evicted {
            AppendOutcome::Evicted
        } else {
            AppendOutcome::Appended
        }
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inclusive on both ends, in stored order.
    pub fn range(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<Sample> {
        if since > until {
            return Vec::new();
        }

        let start = self.samples.partition_point(|sample| sample.timestamp < since);
        let end = self.samples.partition_point(|sample| sample.timestamp <= until);
        if start >= end {
            return Vec::new();
        }

        self.samples.range(start..end).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }
}
