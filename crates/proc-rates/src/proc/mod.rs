// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `/proc` counter sources.
//!
//! Each source turns one or two kernel statistics files into a flat
//! [`Snapshot`](crate::snapshot::Snapshot) of cumulative counters.
//!
//! # Supported Families
//!
//! - **processes**: last assigned PID (`new`) from `/proc/loadavg`, running and
//!   blocked task counts from `/proc/stat`
//! - **paging**: `pgpgin`, `pgpgout`, `pswpin`, `pswpout` from `/proc/vmstat`,
//!   falling back to the legacy `page`/`swap` lines of `/proc/stat`
//! - **cpu**: clock ticks per CPU state from the aggregate `cpu` line of
//!   `/proc/stat`
//!
//! # /proc Filesystem Structure
//!
//! ```text
//! /proc/
//!   ├── loadavg             # Load averages, run queue, last PID
//!   ├── stat                # CPU ticks, procs_running, procs_blocked
//!   └── vmstat              # Virtual memory counters
//! ```
//!
//! Every read goes to the file; nothing is cached between captures.

pub mod constants;
pub mod cpu;
pub mod paging;
pub mod processes;

use std::fs;
use std::path::Path;

use tracing::trace;

use crate::errors::RateError;

pub use cpu::CpuSource;
pub use paging::PagingSource;
pub use processes::ProcessesSource;

/// Reads a whole statistics file.
///
/// Any I/O failure becomes [`RateError::SourceUnavailable`] carrying the path.
pub(crate) fn read_source(path: &Path) -> Result<String, RateError> {
    let contents =
        fs::read_to_string(path).map_err(|e| RateError::source_unavailable(path, e))?;
    trace!("Read {} bytes from {}", contents.len(), path.display());
    Ok(contents)
}

/// Finds the first line whose first whitespace-separated token is `label` and
/// returns the remaining tokens.
pub(crate) fn labelled_line<'a>(
    contents: &'a str,
    label: &str,
) -> Option<std::str::SplitWhitespace<'a>> {
    contents.lines().find_map(|line| {
        let mut values = line.split_whitespace();
        (values.next() == Some(label)).then_some(values)
    })
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_support::path_from_root;
    use super::*;

    #[test]
    fn test_read_source_missing_file() {
        let path = path_from_root("./tests/proc/stat/nonexistent_stat");
        let err = read_source(&path).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_labelled_line() {
        let contents = "cpu  1 2 3\nprocs_running 4\nprocs_blocked 0\n";
        let mut values = labelled_line(contents, "procs_running").unwrap();
        assert_eq!(values.next(), Some("4"));
        assert!(labelled_line(contents, "procs").is_none());
        assert!(labelled_line(contents, "swap").is_none());
    }
}
