use std::{collections::BTreeMap, fs, path::Path};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::monitor::{ProcessRole, Sample};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write history file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode history: {0}")]
    Encode(serde_json::Error),
    #[error("history file is not a JSON object: {0}")]
    Corrupt(serde_json::Error),
}

#[derive(Debug, Serialize)]
struct StoredSample {
    timestamp: String,
    rss_bytes: u64,
    vms_bytes: u64,
    cpu_percent: f64,
    thread_count: u32,
    pid: u32,
}

/// Lenient mirror of `StoredSample`: every field may be absent or null.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoadedSample {
    timestamp: Option<Value>,
    rss_bytes: Option<u64>,
    vms_bytes: Option<u64>,
    cpu_percent: Option<f64>,
    thread_count: Option<u32>,
    pid: Option<u32>,
}

#[derive(Debug, Default)]
pub(super) struct Decoded {
    pub(super) buffers: BTreeMap<ProcessRole, Vec<Sample>>,
    pub(super) skipped_entries: usize,
    pub(super) unknown_roles: Vec<String>,
}

pub(super) fn encode(buffers: &BTreeMap<ProcessRole, Vec<Sample>>) -> Result<Vec<u8>, PersistError> {
    let document = buffers
        .iter()
        .map(|(role, samples)| {
            let stored = samples
                .iter()
                .map(|sample| StoredSample {
                    timestamp: sample.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    rss_bytes: sample.rss_bytes,
                    vms_bytes: sample.vms_bytes,
                    cpu_percent: sample.cpu_percent,
                    thread_count: sample.thread_count,
                    pid: sample.pid,
                })
                .collect::<Vec<_>>();
            (role.as_str(), stored)
        })
        .collect::<BTreeMap<_, _>>();

    serde_json::to_vec_pretty(&document).map_err(PersistError::Encode)
}

pub(super) fn decode(raw: &str) -> Result<Decoded, PersistError> {
    let document: serde_json::Map<String, Value> =
        serde_json::from_str(raw).map_err(PersistError::Corrupt)?;

    let mut decoded = Decoded::default();
    for (key, value) in document {
        let Some(role) = ProcessRole::parse(&key) else {
            decoded.unknown_roles.push(key);
            continue;
        };
        let Value::Array(entries) = value else {
            decoded.unknown_roles.push(key);
            continue;
        };

        let samples = decoded.buffers.entry(role).or_default();
        for entry in entries {
            match decode_entry(role, entry) {
                Some(sample) => samples.push(sample),
                None => decoded.skipped_entries += 1,
            }
        }
    }

    Ok(decoded)
}

fn decode_entry(role: ProcessRole, entry: Value) -> Option<Sample> {
    let loaded = serde_json::from_value::<LoadedSample>(entry).ok()?;
    let timestamp = parse_timestamp(loaded.timestamp?)?;

    Some(Sample {
        timestamp,
        process_role: role,
        pid: loaded.pid.unwrap_or(0),
        rss_bytes: loaded.rss_bytes.unwrap_or(0),
        vms_bytes: loaded.vms_bytes.unwrap_or(0),
        cpu_percent: loaded.cpu_percent.unwrap_or(0.0),
        thread_count: loaded.thread_count.unwrap_or(0),
    })
}

/// RFC 3339 strings, or Unix seconds for files written by older tooling.
fn parse_timestamp(value: Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(number) => {
            let secs = number.as_f64()?;
            if !secs.is_finite() {
                return None;
            }
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
            Utc.timestamp_opt(whole, nanos.min(999_999_999)).single()
        }
        _ => None,
    }
}

/// Write to a sibling temp file and rename, so a crash never leaves a half-written file.
pub(super) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let io_error = |source| PersistError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, bytes).map_err(io_error)?;
    fs::rename(tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(tmp_path);
        io_error(source)
    })
}
