// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::AgentError;
use proc_rates::{MetricFamily, ProcConfig};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_INTERVAL_SECS: u64 = 10;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the sampling agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Counter families to sample, in report order
    pub families: Vec<MetricFamily>,
    /// Seconds between two reports
    pub interval_secs: u64,
    /// Directory holding one `<family>.json` baseline per family
    pub persist_dir: Option<PathBuf>,
    /// Emit a single report and exit
    pub oneshot: bool,
    /// Report raw counter values instead of rates
    pub raw: bool,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            families: MetricFamily::ALL.to_vec(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            persist_dir: None,
            oneshot: false,
            raw: false,
            log_level: "info".to_string(),
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, AgentError> {
        let families = match env::var("PROC_RATES_FAMILIES") {
            Ok(val) if !val.trim().is_empty() => parse_families(&val)?,
            _ => MetricFamily::ALL.to_vec(),
        };
        let interval_secs = match env::var("PROC_RATES_INTERVAL_SECS") {
            Ok(val) => val.trim().parse::<u64>().map_err(|_| {
                AgentError::InvalidConfig(format!(
                    "PROC_RATES_INTERVAL_SECS must be a whole number of seconds, got '{val}'"
                ))
            })?,
            Err(_) => DEFAULT_INTERVAL_SECS,
        };
        let persist_dir = env::var_os("PROC_RATES_PERSIST_DIR")
            .filter(|val| !val.is_empty())
            .map(PathBuf::from);
        let oneshot = env::var("PROC_RATES_ONESHOT")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);
        let raw = env::var("PROC_RATES_RAW")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);
        let log_level = env::var("PROC_RATES_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            families,
            interval_secs,
            persist_dir,
            oneshot,
            raw,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.families.is_empty() {
            return Err(AgentError::InvalidConfig(
                "at least one metric family must be selected".to_string(),
            ));
        }

        if self.interval_secs == 0 {
            return Err(AgentError::InvalidConfig(
                "sampling interval must be greater than 0".to_string(),
            ));
        }

        if let Some(dir) = &self.persist_dir {
            if !dir.is_dir() {
                return Err(AgentError::InvalidConfig(format!(
                    "persist directory {} does not exist",
                    dir.display()
                )));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(AgentError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// File configuration for one family's engine.
    ///
    /// The persist directory takes precedence over a single persist path,
    /// which is only accepted when exactly one family is sampled.
    pub fn proc_config_for(
        &self,
        base: &ProcConfig,
        family: MetricFamily,
    ) -> Result<ProcConfig, AgentError> {
        match (&self.persist_dir, &base.persist_path) {
            (Some(dir), _) => Ok(base.with_persist_path(dir.join(family.store_file_name()))),
            (None, Some(_)) if self.families.len() > 1 => Err(AgentError::InvalidConfig(
                "PROC_RATES_PERSIST_PATH holds a single family, use PROC_RATES_PERSIST_DIR to persist several"
                    .to_string(),
            )),
            (None, _) => Ok(base.clone()),
        }
    }
}

/// Parses a comma-separated family list, dropping repeats.
fn parse_families(val: &str) -> Result<Vec<MetricFamily>, AgentError> {
    let mut families = Vec::new();
    for name in val.split(',').filter(|name| !name.trim().is_empty()) {
        let family: MetricFamily = name.parse()?;
        if !families.contains(&family) {
            families.push(family);
        }
    }
    Ok(families)
}
