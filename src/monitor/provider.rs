use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use thiserror::Error;

use super::sample::ProcessMetrics;

/// One row of the OS process table, as seen by role matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub exe: Option<String>,
    pub cmdline: String,
    pub thread_count: Option<u32>,
}

#[derive(Debug, Error, Clone)]
pub enum ProbeError {
    #[error("process {pid} exited before it could be read")]
    ProcessGone { pid: u32 },
    #[error("process listing unavailable: {0}")]
    Listing(String),
    #[error("probe task failed: {0}")]
    Task(String),
    #[error("read timed out after {0}ms")]
    Timeout(u64),
}

/// Source of process metrics. Calls are blocking and run on the blocking pool.
pub trait ProcessProbe: Send + Sync + 'static {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProbeError>;
    fn read_process(&self, pid: u32) -> Result<ProcessMetrics, ProbeError>;
    /// Machine-wide figures; `thread_count` is filled in by the sampler from the listing.
    fn read_system(&self) -> Result<ProcessMetrics, ProbeError>;
}

pub enum ActiveProbe {
    Real(Box<SysinfoProbe>),
    Simulated(SimulatedProbe),
}

impl ActiveProbe {
    pub fn new(simulation_enabled: bool) -> Self {
        if simulation_enabled {
            Self::Simulated(SimulatedProbe::new())
        } else {
            Self::Real(Box::new(SysinfoProbe::new()))
        }
    }
}

impl ProcessProbe for ActiveProbe {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProbeError> {
        match self {
            ActiveProbe::Real(probe) => probe.list_processes(),
            ActiveProbe::Simulated(probe) => probe.list_processes(),
        }
    }

    fn read_process(&self, pid: u32) -> Result<ProcessMetrics, ProbeError> {
        match self {
            ActiveProbe::Real(probe) => probe.read_process(pid),
            ActiveProbe::Simulated(probe) => probe.read_process(pid),
        }
    }

    fn read_system(&self) -> Result<ProcessMetrics, ProbeError> {
        match self {
            ActiveProbe::Real(probe) => probe.read_system(),
            ActiveProbe::Simulated(probe) => probe.read_system(),
        }
    }
}

/// Reads the live process table through `sysinfo`.
///
/// Each tracked pid gets its own `System` so CPU deltas stay per process and a
/// stuck read only blocks that pid's reader.
pub struct SysinfoProbe {
    listing: Mutex<System>,
    machine: Mutex<System>,
    readers: Mutex<HashMap<u32, Arc<Mutex<System>>>>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            listing: Mutex::new(System::new()),
            machine: Mutex::new(System::new()),
            readers: Mutex::new(HashMap::new()),
        }
    }

    fn reader_for(&self, pid: u32) -> Arc<Mutex<System>> {
        let mut readers = self.readers.lock();
        readers
            .entry(pid)
            .or_insert_with(|| Arc::new(Mutex::new(System::new())))
            .clone()
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProbeError> {
        let entries = {
            let mut system = self.listing.lock();
            system.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing()
                    .with_exe(UpdateKind::OnlyIfNotSet)
                    .with_cmd(UpdateKind::OnlyIfNotSet)
                    .with_tasks(),
            );

            system
                .processes()
                .iter()
                .filter(|(_, process)| process.thread_kind().is_none())
                .map(|(pid, process)| ProcessEntry {
                    pid: pid.as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                    exe: process.exe().map(|path| path.display().to_string()),
                    cmdline: process
                        .cmd()
                        .iter()
                        .map(|arg| arg.to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join(" "),
                    thread_count: process.tasks().map(|tasks| tasks.len() as u32),
                })
                .collect::<Vec<_>>()
        };

        if entries.is_empty() {
            return Err(ProbeError::Listing("process table is empty".to_string()));
        }

        let alive = entries.iter().map(|entry| entry.pid).collect::<HashSet<_>>();
        self.readers.lock().retain(|pid, _| alive.contains(pid));

        Ok(entries)
    }

    fn read_process(&self, pid: u32) -> Result<ProcessMetrics, ProbeError> {
        let reader = self.reader_for(pid);
        let mut system = reader.lock();
        let sys_pid = Pid::from_u32(pid);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing()
                .with_memory()
                .with_cpu()
                .with_tasks(),
        );

        let process = system
            .process(sys_pid)
            .ok_or(ProbeError::ProcessGone { pid })?;

        Ok(ProcessMetrics {
            pid,
            rss_bytes: process.memory(),
            vms_bytes: process.virtual_memory(),
            cpu_percent: process.cpu_usage() as f64,
            thread_count: process
                .tasks()
                .map(|tasks| tasks.len() as u32)
                .unwrap_or(0),
        })
    }

    fn read_system(&self) -> Result<ProcessMetrics, ProbeError> {
        let mut system = self.machine.lock();
        system.refresh_memory();
        system.refresh_cpu_usage();

        Ok(ProcessMetrics {
            pid: 0,
            rss_bytes: system.used_memory(),
            vms_bytes: system.used_memory().saturating_add(system.used_swap()),
            cpu_percent: system.global_cpu_usage() as f64,
            thread_count: 0,
        })
    }
}

const SIMULATED_MENUBAR_PID: u32 = 41_001;
const SIMULATED_SERVICE_PID: u32 = 41_002;
const MB: f64 = 1024.0 * 1024.0;

/// Synthetic processes for demos: a steady menu-bar app and a slowly leaking service.
pub struct SimulatedProbe {
    tick: AtomicU64,
}

impl SimulatedProbe {
    pub fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
        }
    }
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SimulatedProbe {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProbeError> {
        self.tick.fetch_add(1, Ordering::Relaxed);

        Ok(vec![
            ProcessEntry {
                pid: SIMULATED_MENUBAR_PID,
                name: "clipboard_menubar".to_string(),
                exe: Some("/Applications/Clipboard.app/Contents/MacOS/clipboard_menubar".to_string()),
                cmdline: "clipboard_menubar".to_string(),
                thread_count: Some(6),
            },
            ProcessEntry {
                pid: SIMULATED_SERVICE_PID,
                name: "clipboard_service".to_string(),
                exe: Some("/Applications/Clipboard.app/Contents/MacOS/clipboard_service".to_string()),
                cmdline: "clipboard_service --background".to_string(),
                thread_count: Some(4),
            },
        ])
    }

    fn read_process(&self, pid: u32) -> Result<ProcessMetrics, ProbeError> {
        let tick = self.tick.load(Ordering::Relaxed) as f64;
        let phase = tick / 8.0;

        let (rss_mb, cpu, threads) = match pid {
            SIMULATED_MENUBAR_PID => (80.0 + phase.sin() * 1.5, 2.0 + phase.cos().abs() * 3.0, 6),
            // ~40 KiB per tick keeps the service well inside the leak band at a 2s cadence.
            SIMULATED_SERVICE_PID => (60.0 + tick * 0.04, 5.0 + (phase * 0.5).sin().abs() * 10.0, 4),
            _ => return Err(ProbeError::ProcessGone { pid }),
        };

        let rss_bytes = (rss_mb.max(1.0) * MB) as u64;
        Ok(ProcessMetrics {
            pid,
            rss_bytes,
            vms_bytes: rss_bytes.saturating_mul(4),
            cpu_percent: cpu,
            thread_count: threads,
        })
    }

    fn read_system(&self) -> Result<ProcessMetrics, ProbeError> {
        let tick = self.tick.load(Ordering::Relaxed) as f64;
        let used = (8_192.0 + (tick / 20.0).sin() * 256.0) * MB;

        Ok(ProcessMetrics {
            pid: 0,
            rss_bytes: used as u64,
            vms_bytes: (used + 512.0 * MB) as u64,
            cpu_percent: 20.0 + (tick / 10.0).sin().abs() * 15.0,
            thread_count: 0,
        })
    }
}

#[cfg(test)]
pub(crate) struct MockProbe {
    pub(crate) processes: Result<Vec<ProcessEntry>, ProbeError>,
    pub(crate) metrics: HashMap<u32, Result<ProcessMetrics, ProbeError>>,
    pub(crate) delays: HashMap<u32, std::time::Duration>,
    pub(crate) system: Result<ProcessMetrics, ProbeError>,
}

#[cfg(test)]
impl MockProbe {
    pub(crate) fn entry(pid: u32, name: &str) -> ProcessEntry {
        ProcessEntry {
            pid,
            name: name.to_string(),
            exe: Some(format!("/usr/local/bin/{}", name)),
            cmdline: name.to_string(),
            thread_count: Some(3),
        }
    }

    pub(crate) fn metrics(pid: u32, rss_bytes: u64) -> ProcessMetrics {
        ProcessMetrics {
            pid,
            rss_bytes,
            vms_bytes: rss_bytes * 2,
            cpu_percent: 1.5,
            thread_count: 3,
        }
    }

    pub(crate) fn new(processes: Vec<ProcessEntry>) -> Self {
        Self {
            processes: Ok(processes),
            metrics: HashMap::new(),
            delays: HashMap::new(),
            system: Ok(ProcessMetrics {
                pid: 0,
                rss_bytes: 4 << 30,
                vms_bytes: 5 << 30,
                cpu_percent: 12.5,
                thread_count: 0,
            }),
        }
    }
}

#[cfg(test)]
impl ProcessProbe for MockProbe {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProbeError> {
        self.processes.clone()
    }

    fn read_process(&self, pid: u32) -> Result<ProcessMetrics, ProbeError> {
        if let Some(delay) = self.delays.get(&pid) {
            std::thread::sleep(*delay);
        }
        self.metrics
            .get(&pid)
            .cloned()
            .unwrap_or(Err(ProbeError::ProcessGone { pid }))
    }

    fn read_system(&self) -> Result<ProcessMetrics, ProbeError> {
        self.system.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProcessProbe, SimulatedProbe, SysinfoProbe};

    #[test]
    fn sysinfo_probe_reads_current_process() {
        let probe = SysinfoProbe::new();
        let processes = probe.list_processes().expect("listing should succeed");
        let current_pid = std::process::id();
        assert!(processes.iter().any(|entry| entry.pid == current_pid));

        let metrics = probe
            .read_process(current_pid)
            .expect("current process should be readable");
        assert_eq!(metrics.pid, current_pid);
        assert!(metrics.rss_bytes > 0);
    }

    #[test]
    fn sysinfo_probe_reports_missing_pid() {
        let probe = SysinfoProbe::new();
        assert!(probe.read_process(999_999_999).is_err());
    }

    #[test]
    fn simulated_service_grows() {
        let probe = SimulatedProbe::new();
        let processes = probe.list_processes().expect("simulated listing");
        let service = processes
            .iter()
            .find(|entry| entry.name == "clipboard_service")
            .expect("service entry");
        let first = probe.read_process(service.pid).expect("first read");

        for _ in 0..50 {
            probe.list_processes().expect("simulated listing");
        }
        let later = probe.read_process(service.pid).expect("later read");
        assert!(later.rss_bytes > first.rss_bytes);
    }
}
