use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{task::JoinSet, time::timeout};

use crate::config::RoleRule;
use crate::history::{AppendOutcome, HistoryStore};

use super::{
    matcher::resolve_roles,
    provider::{ProbeError, ProcessEntry, ProcessProbe},
    sample::{ProcessMetrics, ProcessRole},
};

#[derive(Debug, Clone)]
pub struct SamplerOptions {
    pub read_timeout: Duration,
    pub track_system_total: bool,
    /// Excluded from role matching so the monitor never tracks itself.
    pub self_pid: u32,
}

/// What one sampling tick did, for logging and tests.
#[derive(Debug, Default)]
pub struct TickReport {
    pub recorded: Vec<ProcessRole>,
    pub failed: Vec<(ProcessRole, ProbeError)>,
    pub unresolved: Vec<ProcessRole>,
}

pub struct Sampler<P> {
    probe: Arc<P>,
    rules: Vec<RoleRule>,
    options: SamplerOptions,
    last_pids: BTreeMap<ProcessRole, u32>,
}

impl<P: ProcessProbe> Sampler<P> {
    pub fn new(probe: Arc<P>, rules: Vec<RoleRule>, options: SamplerOptions) -> Self {
        Self {
            probe,
            rules,
            options,
            last_pids: BTreeMap::new(),
        }
    }

    /// Sample every configured role once. All samples of a tick share `now`.
    ///
    /// A role that is not running, fails to read or exceeds the read timeout is
    /// skipped for this tick; the others are still recorded.
    pub async fn tick(&mut self, store: &HistoryStore, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        let processes = match self.blocking(|probe| probe.list_processes()).await {
            Ok(processes) => processes,
            Err(error) => {
                log::warn!("sampler_listing_failed error={}", error);
                Vec::new()
            }
        };

        let resolved = resolve_roles(&processes, &self.rules, self.options.self_pid);
        self.note_role_changes(&resolved, &mut report);

        let mut reads = JoinSet::new();
        for (&role, &pid) in &resolved {
            let probe = Arc::clone(&self.probe);
            let read_timeout = self.options.read_timeout;
            reads.spawn(async move {
                let result = read_with_timeout(probe, read_timeout, move |probe| probe.read_process(pid)).await;
                (role, pid, result)
            });
        }

        if self.options.track_system_total {
            let probe = Arc::clone(&self.probe);
            let read_timeout = self.options.read_timeout;
            let thread_total = total_threads(&processes);
            reads.spawn(async move {
                let result = read_with_timeout(probe, read_timeout, |probe| probe.read_system())
                    .await
                    .map(|metrics| ProcessMetrics {
                        thread_count: thread_total,
                        ..metrics
                    });
                (ProcessRole::SystemTotal, 0, result)
            });
        }

        while let Some(joined) = reads.join_next().await {
            let (role, pid, result) = match joined {
                Ok(read) => read,
                Err(error) => {
                    log::error!("sampler_task_failed error={}", error);
                    continue;
                }
            };

            match result {
                Ok(metrics) => {
                    if store.append(role, metrics.into_sample(role, now)) != AppendOutcome::Rejected {
                        report.recorded.push(role);
                    }
                }
                Err(error) => {
                    log_read_failure(role, pid, &error);
                    report.failed.push((role, error));
                }
            }
        }

        report.recorded.sort();
        tracing::info!(
            target: "sampler",
            module = "sampler",
            timestamp = %now.to_rfc3339(),
            resolved_roles = resolved.len(),
            recorded = report.recorded.len(),
            failed = report.failed.len(),
            unresolved = report.unresolved.len(),
            "sampler_tick"
        );

        report
    }

    async fn blocking<T, F>(&self, read: F) -> Result<T, ProbeError>
    where
        T: Send + 'static,
        F: FnOnce(&P) -> Result<T, ProbeError> + Send + 'static,
    {
        read_with_timeout(Arc::clone(&self.probe), self.options.read_timeout, read).await
    }

    fn note_role_changes(&mut self, resolved: &BTreeMap<ProcessRole, u32>, report: &mut TickReport) {
        for rule in &self.rules {
            let role = rule.role;
            let current = resolved.get(&role).copied();
            let previous = self.last_pids.get(&role).copied();

            match (previous, current) {
                (Some(old), Some(new)) if old != new => {
                    log::info!("role_pid_changed role={} old_pid={} new_pid={}", role, old, new);
                }
                (None, Some(pid)) => {
                    log::info!("role_resolved role={} pid={}", role, pid);
                }
                (Some(old), None) => {
                    log::warn!("role_unresolved role={} last_pid={}", role, old);
                }
                _ => {}
            }

            if current.is_none() {
                report.unresolved.push(role);
            }
        }

        self.last_pids = resolved.clone();
    }
}

async fn read_with_timeout<P, T, F>(probe: Arc<P>, read_timeout: Duration, read: F) -> Result<T, ProbeError>
where
    P: ProcessProbe,
    T: Send + 'static,
    F: FnOnce(&P) -> Result<T, ProbeError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(move || read(probe.as_ref()));

    match timeout(read_timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ProbeError::Task(join_error.to_string())),
        Err(_) => Err(ProbeError::Timeout(read_timeout.as_millis() as u64)),
    }
}

fn total_threads(processes: &[ProcessEntry]) -> u32 {
    processes
        .iter()
        .filter_map(|entry| entry.thread_count)
        .fold(0u32, u32::saturating_add)
}

fn log_read_failure(role: ProcessRole, pid: u32, error: &ProbeError) {
    match error {
        ProbeError::Timeout(timeout_ms) => {
            log::warn!(
                "sampler_read_timeout role={} pid={} timeout_ms={}",
                role,
                pid,
                timeout_ms
            );
        }
        ProbeError::ProcessGone { .. } => {
            log::info!("sampler_process_gone role={} pid={}", role, pid);
        }
        other => {
            log::warn!("sampler_read_failed role={} pid={} error={}", role, pid, other);
        }
    }
}
