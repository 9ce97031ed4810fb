// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process creation, run queue and blocked task counters.
//!
//! Two files are read per capture:
//!
//! ```text
//! /proc/loadavg:  0.20 0.18 0.12 1/80 11206
//!                                       ^^^^^ last PID assigned -> "new"
//! /proc/stat:     procs_running 2       -> "running"
//!                 procs_blocked 0       -> "blocked"
//! ```
//!
//! `new` grows by one for every process or thread the kernel creates. When
//! PIDs wrap around at `pid_max` it moves backwards, which the rate rule
//! reports as a reset.
//!
//! The last PID only tells where the allocator currently is, not how many
//! laps it made. If more than `pid_max` tasks are created between two
//! captures (possible with long gaps between persisted one-shot runs), the
//! surplus laps are lost and `new` is undercounted without any reset being
//! visible.

use std::path::{Path, PathBuf};

use crate::config::ProcConfig;
use crate::errors::RateError;
use crate::proc::{labelled_line, read_source};
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;

pub const NEW_KEY: &str = "new";
pub const RUNNING_KEY: &str = "running";
pub const BLOCKED_KEY: &str = "blocked";

/// Snapshot source for the `processes` family.
#[derive(Debug, Clone)]
pub struct ProcessesSource {
    loadavg_path: PathBuf,
    stat_path: PathBuf,
}

impl ProcessesSource {
    #[must_use]
    pub fn new(config: &ProcConfig) -> Self {
        Self {
            loadavg_path: config.loadavg_path(),
            stat_path: config.stat_path(),
        }
    }
}

impl SnapshotSource for ProcessesSource {
    fn capture(&self) -> Result<Snapshot, RateError> {
        let mut snapshot = Snapshot::new();
        read_last_pid_from_path(&self.loadavg_path, &mut snapshot)?;
        read_task_counts_from_path(&self.stat_path, &mut snapshot)?;
        Ok(snapshot)
    }
}

/// Reads the last assigned PID (5th field) from a `loadavg` file.
fn read_last_pid_from_path(path: &Path, snapshot: &mut Snapshot) -> Result<(), RateError> {
    let contents = read_source(path)?;
    let last_pid = contents.split_whitespace().nth(4).ok_or_else(|| {
        RateError::Validation(format!(
            "last PID field not found in {}",
            path.display()
        ))
    })?;
    snapshot.insert_raw(NEW_KEY, last_pid)
}

/// Reads `procs_running` and `procs_blocked` from a `stat` file.
fn read_task_counts_from_path(path: &Path, snapshot: &mut Snapshot) -> Result<(), RateError> {
    let contents = read_source(path)?;
    for (label, key) in [("procs_running", RUNNING_KEY), ("procs_blocked", BLOCKED_KEY)] {
        let value = labelled_line(&contents, label)
            .and_then(|mut values| values.next())
            .ok_or_else(|| {
                RateError::Validation(format!("{label} not found in {}", path.display()))
            })?;
        snapshot.insert_raw(key, value)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proc::test_support::path_from_root;

    fn source(loadavg: &str, stat: &str) -> ProcessesSource {
        ProcessesSource {
            loadavg_path: path_from_root(loadavg),
            stat_path: path_from_root(stat),
        }
    }

    #[test]
    fn test_capture_processes() {
        let snapshot = source(
            "./tests/proc/loadavg/valid_loadavg",
            "./tests/proc/stat/valid_stat",
        )
        .capture()
        .unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get(NEW_KEY), Some(11206));
        assert_eq!(snapshot.get(RUNNING_KEY), Some(2));
        assert_eq!(snapshot.get(BLOCKED_KEY), Some(1));
    }

    #[test]
    fn test_capture_from_config_base_path() {
        let config = ProcConfig {
            base_path: path_from_root("./tests/proc/base"),
            ..Default::default()
        };
        let snapshot = ProcessesSource::new(&config).capture().unwrap();
        assert_eq!(snapshot.get(NEW_KEY), Some(4821));
    }

    #[test]
    fn test_malformed_loadavg() {
        let result = source(
            "./tests/proc/loadavg/malformed_loadavg",
            "./tests/proc/stat/valid_stat",
        )
        .capture();
        assert!(matches!(result, Err(RateError::Validation(_))));

        let result = source(
            "./tests/proc/loadavg/invalid_loadavg_non_numerical_pid",
            "./tests/proc/stat/valid_stat",
        )
        .capture();
        assert!(matches!(result, Err(RateError::Validation(_))));
    }

    #[test]
    fn test_missing_files() {
        let result = source(
            "./tests/proc/loadavg/nonexistent_loadavg",
            "./tests/proc/stat/valid_stat",
        )
        .capture();
        assert!(result.unwrap_err().is_not_found());

        let result = source(
            "./tests/proc/loadavg/valid_loadavg",
            "./tests/proc/stat/nonexistent_stat",
        )
        .capture();
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_stat_without_task_counts() {
        let result = source(
            "./tests/proc/loadavg/valid_loadavg",
            "./tests/proc/stat/invalid_stat_missing_procs",
        )
        .capture();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("procs_blocked"));
    }

    #[test]
    fn test_stat_with_non_numerical_task_count() {
        let result = source(
            "./tests/proc/loadavg/valid_loadavg",
            "./tests/proc/stat/invalid_stat_non_numerical_procs",
        )
        .capture();
        assert!(matches!(result, Err(RateError::Validation(_))));
    }
}
