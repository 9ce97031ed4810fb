// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Paging and swapping counters.
//!
//! `/proc/vmstat` is the preferred source:
//!
//! ```text
//! pgpgin 1234567
//! pgpgout 7654321
//! pswpin 12
//! pswpout 34
//! ```
//!
//! Kernels before 2.6 have no `vmstat` and report the same counters on two
//! lines of `/proc/stat`:
//!
//! ```text
//! page 1234567 7654321
//! swap 12 34
//! ```
//!
//! The `stat` lines are only consulted for keys `vmstat` did not provide, and
//! never overwrite a value already found.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ProcConfig;
use crate::errors::RateError;
use crate::proc::constants::PAGING_KEYS;
use crate::proc::{labelled_line, read_source};
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;

/// Legacy `stat` lines and the keys their two columns map to.
const LEGACY_LINES: [(&str, [&str; 2]); 2] = [
    ("page", ["pgpgin", "pgpgout"]),
    ("swap", ["pswpin", "pswpout"]),
];

/// Snapshot source for the `paging` family.
#[derive(Debug, Clone)]
pub struct PagingSource {
    vmstat_path: PathBuf,
    stat_path: PathBuf,
}

impl PagingSource {
    #[must_use]
    pub fn new(config: &ProcConfig) -> Self {
        Self {
            vmstat_path: config.vmstat_path(),
            stat_path: config.stat_path(),
        }
    }
}

impl SnapshotSource for PagingSource {
    fn capture(&self) -> Result<Snapshot, RateError> {
        let mut snapshot = Snapshot::new();

        // A missing vmstat is expected on old kernels; keep the error in case
        // the fallback cannot fill in every key either
        let vmstat_error = match read_vmstat_from_path(&self.vmstat_path, &mut snapshot) {
            Ok(()) => None,
            Err(e) if e.is_not_found() => {
                debug!("{e}, falling back to {}", self.stat_path.display());
                Some(e)
            }
            Err(e) => return Err(e),
        };

        if missing_keys(&snapshot).next().is_some() {
            read_legacy_stat_from_path(&self.stat_path, &mut snapshot)?;
        }

        let missing: Vec<&str> = missing_keys(&snapshot).collect();
        if missing.is_empty() {
            return Ok(snapshot);
        }
        match vmstat_error {
            Some(e) => Err(e),
            None => Err(RateError::Validation(format!(
                "paging counters not found: {}",
                missing.join(", ")
            ))),
        }
    }
}

fn missing_keys(snapshot: &Snapshot) -> impl Iterator<Item = &'static str> + '_ {
    PAGING_KEYS
        .into_iter()
        .filter(|key| !snapshot.contains_key(key))
}

/// Reads the paging counters present in a `vmstat` file.
fn read_vmstat_from_path(path: &Path, snapshot: &mut Snapshot) -> Result<(), RateError> {
    let contents = read_source(path)?;
    for line in contents.lines() {
        let mut values = line.split_whitespace();
        let (Some(name), Some(value)) = (values.next(), values.next()) else {
            continue;
        };
        if PAGING_KEYS.contains(&name) && !snapshot.contains_key(name) {
            snapshot.insert_raw(name, value)?;
        }
    }
    Ok(())
}

/// Fills keys still absent from `snapshot` using the `page`/`swap` lines of a
/// `stat` file.
fn read_legacy_stat_from_path(path: &Path, snapshot: &mut Snapshot) -> Result<(), RateError> {
    let contents = read_source(path)?;
    for (label, keys) in LEGACY_LINES {
        let Some(values) = labelled_line(&contents, label) else {
            continue;
        };
        for (key, value) in keys.into_iter().zip(values) {
            if !snapshot.contains_key(key) {
                debug!("Using {label} line of {} for {key}", path.display());
                snapshot.insert_raw(key, value)?;
            }
        }
    }
    Ok(())
}
