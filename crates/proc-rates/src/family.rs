// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Named counter families and the sources that back them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ProcConfig;
use crate::errors::RateError;
use crate::proc::{CpuSource, PagingSource, ProcessesSource};
use crate::source::SnapshotSource;

/// A family of related kernel counters sampled by one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFamily {
    /// Process creation, run queue and blocked tasks
    Processes,
    /// Pages paged and swapped in and out
    Paging,
    /// CPU clock ticks per state
    Cpu,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [
        MetricFamily::Processes,
        MetricFamily::Paging,
        MetricFamily::Cpu,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetricFamily::Processes => "processes",
            MetricFamily::Paging => "paging",
            MetricFamily::Cpu => "cpu",
        }
    }

    /// Builds the source reading this family's files.
    #[must_use]
    pub fn source(self, config: &ProcConfig) -> Box<dyn SnapshotSource + Send> {
        match self {
            MetricFamily::Processes => Box::new(ProcessesSource::new(config)),
            MetricFamily::Paging => Box::new(PagingSource::new(config)),
            MetricFamily::Cpu => Box::new(CpuSource::new(config)),
        }
    }

    /// File name used when this family's baseline is persisted in a directory.
    #[must_use]
    pub fn store_file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricFamily {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processes" => Ok(MetricFamily::Processes),
            "paging" => Ok(MetricFamily::Paging),
            "cpu" => Ok(MetricFamily::Cpu),
            other => Err(RateError::Configuration(format!(
                "Unknown metric family '{other}'. Must be one of: processes, paging, cpu"
            ))),
        }
    }
}
