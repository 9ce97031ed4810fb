// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types shared by sources, stores and the delta-rate engine.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while sampling counters or computing rates
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("Source unavailable at {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to persist snapshot at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Persisted snapshot at {} is corrupt: {source}", .path.display())]
    CorruptSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RateError {
    pub(crate) fn source_unavailable(path: &Path, source: io::Error) -> Self {
        RateError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn persistence(path: &Path, source: io::Error) -> Self {
        RateError::Persistence {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error means the underlying file simply does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RateError::SourceUnavailable { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }
}
