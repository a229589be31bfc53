use std::collections::BTreeMap;

use crate::config::RoleRule;

use super::{provider::ProcessEntry, sample::ProcessRole};

/// Resolve each configured role to the PID currently playing it.
///
/// An explicit `pid` wins when that process is in the list. Otherwise the lowest
/// PID whose executable path, name or command line contains `pattern` is chosen.
/// `self_pid` is never matched. Roles with no match are absent from the result.
pub fn resolve_roles(
    processes: &[ProcessEntry],
    rules: &[RoleRule],
    self_pid: u32,
) -> BTreeMap<ProcessRole, u32> {
    let mut resolved = BTreeMap::new();

    for rule in rules {
        if let Some(pid) = rule.pid
            && pid != self_pid
            && processes.iter().any(|entry| entry.pid == pid)
        {
            resolved.insert(rule.role, pid);
            continue;
        }

        let pattern = rule.pattern.trim();
        if pattern.is_empty() {
            continue;
        }

        let found = processes
            .iter()
            .filter(|entry| entry.pid != self_pid && matches_pattern(entry, pattern))
            .map(|entry| entry.pid)
            .min();

        if let Some(pid) = found {
            resolved.insert(rule.role, pid);
        }
    }

    resolved
}

fn matches_pattern(entry: &ProcessEntry, pattern: &str) -> bool {
    entry
        .exe
        .as_deref()
        .is_some_and(|exe| exe.contains(pattern))
        || entry.name.contains(pattern)
        || entry.cmdline.contains(pattern)
}
