// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Persistence of the engine baseline across process runs.
//!
//! The on-disk format is a flat JSON object: one entry per counter plus a
//! reserved `time` field holding the capture timestamp in epoch seconds.
//!
//! ```text
//! {"pgpgin":650,"pgpgout":200,"pswpin":0,"pswpout":0,"time":1718000002.5}
//! ```
//!
//! Counter values may also be stored as digit strings (`"650"`); anything
//! else is rejected on load.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::RateError;
use crate::snapshot::{parse_counter, Sample, Snapshot, Timestamp};

/// Name of the reserved timestamp field in the persisted object.
pub const TIME_FIELD: &str = "time";

/// Durable storage for one engine's previous sample.
pub trait SnapshotStore {
    /// Loads the persisted sample.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Fails when persisted data exists but cannot be read or understood.
    fn load(&self) -> Result<Option<Sample>, RateError>;

    /// Persists a sample, replacing whatever was stored before.
    ///
    /// # Errors
    ///
    /// Fails when the sample cannot be written.
    fn save(&self, snapshot: &Snapshot, timestamp: Timestamp) -> Result<(), RateError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Box<T> {
    fn load(&self) -> Result<Option<Sample>, RateError> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot, timestamp: Timestamp) -> Result<(), RateError> {
        (**self).save(snapshot, timestamp)
    }
}

#[derive(Serialize)]
struct PersistedSampleRef<'a> {
    #[serde(flatten)]
    counters: &'a Snapshot,
    time: f64,
}

#[derive(Deserialize)]
struct PersistedSample {
    #[serde(default)]
    time: Option<f64>,
    #[serde(flatten)]
    counters: BTreeMap<String, serde_json::Value>,
}

/// [`SnapshotStore`] writing a single JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Sample>, RateError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No persisted snapshot at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(RateError::persistence(&self.path, e)),
        };

        let persisted: PersistedSample =
            serde_json::from_slice(&bytes).map_err(|source| RateError::CorruptSnapshot {
                path: self.path.clone(),
                source,
            })?;

        let time = match persisted.time {
            Some(time) if time.is_finite() => time,
            Some(time) => {
                return Err(RateError::Validation(format!(
                    "persisted snapshot at {} has invalid time {time}",
                    self.path.display()
                )))
            }
            None => {
                return Err(RateError::Validation(format!(
                    "persisted snapshot at {} has no '{TIME_FIELD}' field",
                    self.path.display()
                )))
            }
        };

        let mut snapshot = Snapshot::new();
        for (key, value) in persisted.counters {
            let parsed = match &value {
                serde_json::Value::Number(n) => n.as_u64().ok_or_else(|| {
                    RateError::Validation(format!(
                        "counter '{key}' has non-integer value '{n}'"
                    ))
                })?,
                serde_json::Value::String(s) => parse_counter(&key, s)?,
                other => {
                    return Err(RateError::Validation(format!(
                        "counter '{key}' has non-integer value '{other}'"
                    )))
                }
            };
            snapshot.insert(key, parsed);
        }

        debug!(
            "Loaded {} counters from {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(Some(Sample::new(
            snapshot,
            Timestamp::from_secs_f64(time),
        )))
    }

    fn save(&self, snapshot: &Snapshot, timestamp: Timestamp) -> Result<(), RateError> {
        if snapshot.contains_key(TIME_FIELD) {
            return Err(RateError::Validation(format!(
                "counter key '{TIME_FIELD}' is reserved for the snapshot timestamp"
            )));
        }

        let persisted = PersistedSampleRef {
            counters: snapshot,
            time: timestamp.as_secs_f64(),
        };
        let bytes = serde_json::to_vec(&persisted).map_err(|e| {
            RateError::persistence(&self.path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;

        // Write then rename so a crash never leaves a half-written file behind
        let temp_path = self.temp_path();
        fs::write(&temp_path, bytes).map_err(|e| RateError::persistence(&temp_path, e))?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                debug!("Could not remove {}: {cleanup}", temp_path.display());
            }
            return Err(RateError::persistence(&self.path, e));
        }

        debug!("Persisted {} counters to {}", snapshot.len(), self.path.display());
        Ok(())
    }
}
