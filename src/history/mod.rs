//! Per-role bounded sample history with JSON persistence.
//!
//! Every role owns its ring buffer behind its own read-write lock. Appends for
//! different roles never contend, and readers only hold a lock long enough to
//! clone what they asked for.

mod persist;
mod ring;

use std::{collections::BTreeMap, fs, path::Path};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::monitor::{ProcessRole, Sample};

pub use persist::PersistError;
pub use ring::AppendOutcome;
use ring::RoleHistory;

pub struct HistoryStore {
    slots: [RwLock<RoleHistory>; ProcessRole::COUNT],
}

impl HistoryStore {
    pub fn new(capacity_per_role: usize) -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(RoleHistory::with_capacity(capacity_per_role))),
        }
    }

    fn slot(&self, role: ProcessRole) -> &RwLock<RoleHistory> {
        &self.slots[role as usize]
    }

    pub fn capacity(&self) -> usize {
        self.slot(ProcessRole::Menubar).read().capacity()
    }

    /// Out-of-order samples are logged and dropped, never reordered.
    pub fn append(&self, role: ProcessRole, mut sample: Sample) -> AppendOutcome {
        sample.process_role = role;
        let timestamp = sample.timestamp;

        let mut history = self.slot(role).write();
        let outcome = history.push(sample);
        if outcome == AppendOutcome::Rejected {
            let last = history.latest().map(|latest| latest.timestamp.to_rfc3339());
            drop(history);
            log::warn!(
                "sample_rejected_out_of_order role={} timestamp={} last_stored={}",
                role,
                timestamp.to_rfc3339(),
                last.unwrap_or_default()
            );
        }

        outcome
    }

    pub fn snapshot(&self, role: ProcessRole) -> Option<Sample> {
        self.slot(role).read().latest().cloned()
    }

    /// Samples with `since <= timestamp <= until`, oldest first.
    pub fn query(&self, role: ProcessRole, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<Sample> {
        self.slot(role).read().range(since, until)
    }

    /// Samples no older than `window` before the newest sample of the role.
    pub fn latest_window(&self, role: ProcessRole, window: Duration) -> Vec<Sample> {
        let history = self.slot(role).read();
        let Some(latest) = history.latest() else {
            return Vec::new();
        };
        let until = latest.timestamp;
        let since = until.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        history.range(since, until)
    }

    pub fn all(&self, role: ProcessRole) -> Vec<Sample> {
        self.slot(role).read().to_vec()
    }

    pub fn len(&self, role: ProcessRole) -> usize {
        self.slot(role).read().len()
    }

    pub fn counts(&self) -> BTreeMap<ProcessRole, usize> {
        ProcessRole::ALL
            .into_iter()
            .map(|role| (role, self.len(role)))
            .collect()
    }

    /// Copy of every non-empty buffer.
    pub fn export(&self) -> BTreeMap<ProcessRole, Vec<Sample>> {
        ProcessRole::ALL
            .into_iter()
            .map(|role| (role, self.all(role)))
            .filter(|(_, samples)| !samples.is_empty())
            .collect()
    }

    /// Serialize all buffers to `path`. Locks are released before any disk I/O.
    pub fn persist(&self, path: &Path) -> Result<usize, PersistError> {
        let buffers = self.export();
        let written = buffers.values().map(Vec::len).sum();
        let bytes = persist::encode(&buffers)?;
        persist::write_atomic(path, &bytes)?;
        Ok(written)
    }

    /// Restore buffers from `path`. A missing or corrupt file leaves the store empty.
    /// Returns how many samples were restored.
    pub fn load(&self, path: &Path) -> usize {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                log::info!("history_load_skipped path={} reason=missing", path.display());
                return 0;
            }
            Err(error) => {
                log::warn!(
                    "history_load_degraded path={} reason=read_failed error={}",
                    path.display(),
                    error
                );
                return 0;
            }
        };

        let decoded = match persist::decode(&raw) {
            Ok(decoded) => decoded,
            Err(error) => {
                log::warn!(
                    "history_load_degraded path={} reason=corrupt error={}",
                    path.display(),
                    error
                );
                return 0;
            }
        };

        if decoded.skipped_entries > 0 || !decoded.unknown_roles.is_empty() {
            log::warn!(
                "history_load_partial path={} skipped_entries={} unknown_keys={:?}",
                path.display(),
                decoded.skipped_entries,
                decoded.unknown_roles
            );
        }

        let mut restored = 0;
        for (role, samples) in decoded.buffers {
            for sample in samples {
                if self.append(role, sample) != AppendOutcome::Rejected {
                    restored += 1;
                }
            }
        }

        log::info!(
            "history_loaded path={} restored_samples={}",
            path.display(),
            restored
        );
        restored
    }
}
