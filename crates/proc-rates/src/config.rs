// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::RateError;
use crate::proc::constants::{LOADAVG_FILE, PROC_PATH, STAT_FILE, VMSTAT_FILE};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File locations and persistence target for one engine
#[derive(Debug, Clone, PartialEq)]
pub struct ProcConfig {
    /// Root directory prepended to relative file names
    pub base_path: PathBuf,
    /// `stat` file (CPU ticks, run queue, legacy paging lines)
    pub stat_file: PathBuf,
    /// `vmstat` file (paging and swapping counters)
    pub vmstat_file: PathBuf,
    /// `loadavg` file (last assigned PID)
    pub loadavg_file: PathBuf,
    /// Optional path where the engine baseline is persisted between runs
    pub persist_path: Option<PathBuf>,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(PROC_PATH),
            stat_file: PathBuf::from(STAT_FILE),
            vmstat_file: PathBuf::from(VMSTAT_FILE),
            loadavg_file: PathBuf::from(LOADAVG_FILE),
            persist_path: None,
        }
    }
}

impl ProcConfig {
    /// Create configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Configuration`] if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, RateError> {
        let defaults = Self::default();
        let path_var = |name: &str, default: PathBuf| {
            env::var_os(name).map(PathBuf::from).unwrap_or(default)
        };

        let config = Self {
            base_path: path_var("PROC_RATES_BASE_PATH", defaults.base_path),
            stat_file: path_var("PROC_RATES_STAT_FILE", defaults.stat_file),
            vmstat_file: path_var("PROC_RATES_VMSTAT_FILE", defaults.vmstat_file),
            loadavg_file: path_var("PROC_RATES_LOADAVG_FILE", defaults.loadavg_file),
            persist_path: env::var_os("PROC_RATES_PERSIST_PATH")
                .filter(|val| !val.is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Returns a copy persisting to `path`
    #[must_use]
    pub fn with_persist_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            persist_path: Some(path.into()),
            ..self.clone()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Configuration`] describing the first problem found.
    pub fn validate(&self) -> Result<(), RateError> {
        if self.base_path.as_os_str().is_empty() {
            return Err(RateError::Configuration(
                "base path cannot be empty".to_string(),
            ));
        }

        for (name, file) in [
            ("stat", &self.stat_file),
            ("vmstat", &self.vmstat_file),
            ("loadavg", &self.loadavg_file),
        ] {
            if file.as_os_str().is_empty() {
                return Err(RateError::Configuration(format!(
                    "{name} file cannot be empty"
                )));
            }
        }

        if let Some(persist_path) = &self.persist_path {
            validate_persist_path(persist_path)?;
        }

        Ok(())
    }

    #[must_use]
    pub fn stat_path(&self) -> PathBuf {
        self.resolve(&self.stat_file)
    }

    #[must_use]
    pub fn vmstat_path(&self) -> PathBuf {
        self.resolve(&self.vmstat_file)
    }

    #[must_use]
    pub fn loadavg_path(&self) -> PathBuf {
        self.resolve(&self.loadavg_file)
    }

    // Absolute overrides win over the base path
    fn resolve(&self, file: &Path) -> PathBuf {
        self.base_path.join(file)
    }
}

fn validate_persist_path(path: &Path) -> Result<(), RateError> {
    if path.is_dir() {
        return Err(RateError::Configuration(format!(
            "persist path {} is a directory",
            path.display()
        )));
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let metadata = fs::metadata(parent).map_err(|e| {
        RateError::Configuration(format!(
            "persist directory {} is not accessible: {e}",
            parent.display()
        ))
    })?;
    if !metadata.is_dir() {
        return Err(RateError::Configuration(format!(
            "persist directory {} is not a directory",
            parent.display()
        )));
    }
    // Mode bits do not account for who the process runs as
    NamedTempFile::new_in(parent).map_err(|e| {
        RateError::Configuration(format!(
            "persist directory {} is not writable: {e}",
            parent.display()
        ))
    })?;

    Ok(())
}
