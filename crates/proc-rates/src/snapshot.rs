// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Counter snapshots and the timestamps they were captured at.
//!
//! A [`Snapshot`] is one full set of counter readings taken at a single
//! instant. Keys are stable counter names (`pgpgin`, `new`, `blocked`, ...)
//! and values are cumulative, non-negative integers. Snapshots are built once
//! by a source adapter and never mutated afterwards.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::errors::RateError;

/// One set of counter readings, ordered by key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    counters: BTreeMap<String, u64>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a counter reading, returning the value it replaced if any.
    pub fn insert(&mut self, key: impl Into<String>, value: u64) -> Option<u64> {
        self.counters.insert(key.into(), value)
    }

    /// Adds a counter from its raw textual form, as found in `/proc` files.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Validation`] if `raw` is not a non-negative integer.
    pub fn insert_raw(&mut self, key: impl Into<String>, raw: &str) -> Result<(), RateError> {
        let key = key.into();
        let value = parse_counter(&key, raw)?;
        self.counters.insert(key, value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.counters.get(key).copied()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.counters.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Self {
            counters: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K: Into<String>, const N: usize> From<[(K, u64); N]> for Snapshot {
    fn from(entries: [(K, u64); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, u64);
    type IntoIter = btree_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counters.into_iter()
    }
}

/// Parses a raw counter value.
///
/// Only plain ASCII digits are accepted: an empty string, a sign, a decimal
/// point or anything that overflows `u64` is a hard error rather than being
/// coerced to zero.
///
/// # Errors
///
/// Returns [`RateError::Validation`] naming the offending key.
pub fn parse_counter(key: &str, raw: &str) -> Result<u64, RateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RateError::Validation(format!(
            "counter '{key}' has non-integer value '{trimmed}'"
        )));
    }
    trimmed.parse::<u64>().map_err(|e| {
        RateError::Validation(format!("counter '{key}' value '{trimmed}' is out of range: {e}"))
    })
}

/// Wall-clock instant in seconds since the Unix epoch.
///
/// Wall-clock (not monotonic) time is used so persisted timestamps stay
/// comparable across process restarts.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Timestamp(f64);

impl Timestamp {
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`, rounded to two decimals.
    ///
    /// The result is negative when `earlier` lies in the future.
    #[must_use]
    pub fn elapsed_since(self, earlier: Timestamp) -> f64 {
        crate::rate::round2(self.0 - earlier.0)
    }
}

/// Something that can tell the current time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // A clock set before 1970 reads as the epoch itself
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Timestamp(secs)
    }
}

/// A snapshot together with the instant it was captured at.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub snapshot: Snapshot,
    pub timestamp: Timestamp,
}

impl Sample {
    #[must_use]
    pub fn new(snapshot: Snapshot, timestamp: Timestamp) -> Self {
        Self {
            snapshot,
            timestamp,
        }
    }
}
