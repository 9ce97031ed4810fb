// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CPU time counters from the aggregate `cpu` line of `/proc/stat`.
//!
//! ```text
//! cpu  2337 0 188 17838 12 0 4 0 0 0
//!      user nice system idle iowait irq softirq steal guest guest_nice
//! ```
//!
//! Values are cumulative clock ticks (USER_HZ) across all cores, so the
//! resulting rates are ticks per second. Columns beyond `idle` were added in
//! successive kernel releases and are only reported when present.

use std::path::{Path, PathBuf};

use crate::config::ProcConfig;
use crate::errors::RateError;
use crate::proc::constants::CPU_COLUMNS;
use crate::proc::{labelled_line, read_source};
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;

/// Every kernel reports at least user, nice, system and idle.
const MIN_CPU_COLUMNS: usize = 4;

/// Snapshot source for the `cpu` family.
#[derive(Debug, Clone)]
pub struct CpuSource {
    stat_path: PathBuf,
}

impl CpuSource {
    #[must_use]
    pub fn new(config: &ProcConfig) -> Self {
        Self {
            stat_path: config.stat_path(),
        }
    }
}

impl SnapshotSource for CpuSource {
    fn capture(&self) -> Result<Snapshot, RateError> {
        read_cpu_ticks_from_path(&self.stat_path)
    }
}

fn read_cpu_ticks_from_path(path: &Path) -> Result<Snapshot, RateError> {
    let contents = read_source(path)?;
    let values = labelled_line(&contents, "cpu").ok_or_else(|| {
        RateError::Validation(format!("aggregate cpu line not found in {}", path.display()))
    })?;

    let mut snapshot = Snapshot::new();
    for (column, value) in CPU_COLUMNS.into_iter().zip(values) {
        snapshot.insert_raw(column, value)?;
    }

    if snapshot.len() < MIN_CPU_COLUMNS {
        return Err(RateError::Validation(format!(
            "aggregate cpu line in {} has {} columns, expected at least {MIN_CPU_COLUMNS}",
            path.display(),
            snapshot.len()
        )));
    }

    Ok(snapshot)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proc::test_support::path_from_root;

    #[test]
    fn test_get_cpu_ticks() {
        let path = path_from_root("./tests/proc/stat/valid_stat");
        let snapshot = read_cpu_ticks_from_path(&path).unwrap();
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot.get("user"), Some(2337));
        assert_eq!(snapshot.get("nice"), Some(0));
        assert_eq!(snapshot.get("system"), Some(188));
        assert_eq!(snapshot.get("idle"), Some(17838));
        assert_eq!(snapshot.get("iowait"), Some(12));
        assert_eq!(snapshot.get("softirq"), Some(4));
        // Per-core lines are not part of the aggregate
        assert!(!snapshot.contains_key("cpu0"));
    }

    #[test]
    fn test_get_cpu_ticks_legacy_kernel() {
        let path = path_from_root("./tests/proc/stat/legacy_stat");
        let snapshot = read_cpu_ticks_from_path(&path).unwrap();
        assert_eq!(snapshot.len(), 4);
        assert!(!snapshot.contains_key("iowait"));
    }

    #[test]
    fn test_get_cpu_ticks_invalid() {
        let path = path_from_root("./tests/proc/stat/invalid_stat_malformed_first_line");
        assert!(matches!(
            read_cpu_ticks_from_path(&path),
            Err(RateError::Validation(_))
        ));

        let path = path_from_root("./tests/proc/stat/invalid_stat_non_numerical_value");
        assert!(matches!(
            read_cpu_ticks_from_path(&path),
            Err(RateError::Validation(_))
        ));

        let path = path_from_root("./tests/proc/stat/invalid_stat_missing_cpu_line");
        assert!(matches!(
            read_cpu_ticks_from_path(&path),
            Err(RateError::Validation(_))
        ));

        let path = path_from_root("./tests/proc/stat/nonexistent_stat");
        assert!(read_cpu_ticks_from_path(&path).unwrap_err().is_not_found());
    }

    #[test]
    fn test_source_from_config() {
        let config = ProcConfig {
            base_path: path_from_root("./tests/proc/base"),
            ..Default::default()
        };
        let snapshot = CpuSource::new(&config).capture().unwrap();
        assert_eq!(snapshot.get("user"), Some(5000));
    }
}
