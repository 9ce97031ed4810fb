// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delta-rate engine turning successive snapshots into per-second rates.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──> initialize() ──> compute() ──> compute() ──> ...
//!              │                 │
//!              │                 ├─ capture S₂ at T₂
//!              │                 ├─ rates = rule(S₁, S₂, T₂ - T₁)
//!              │                 ├─ persist (S₂, T₂)      (if a store is set)
//!              │                 └─ previous = (S₂, T₂)
//!              │
//!              └─ previous = persisted sample, or a fresh capture
//! ```
//!
//! A cycle either completes (and the baseline advances) or fails before the
//! baseline is touched, so a caller can simply retry after fixing whatever
//! went wrong.
//!
//! # Usage Pattern
//!
//! ```rust,ignore
//! use proc_rates::{DeltaRateEngine, MetricFamily, ProcConfig};
//!
//! let config = ProcConfig::from_env()?;
//! let mut engine = DeltaRateEngine::from_config(MetricFamily::Paging.source(&config), &config)?;
//! engine.initialize()?;
//!
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! let rates = engine.compute()?; // {"pgpgin": 75.0, "pgpgout": 0.0, ...}
//! ```

use tracing::{debug, warn};

use crate::config::ProcConfig;
use crate::errors::RateError;
use crate::rate::{rate, Rates};
use crate::snapshot::{Clock, Sample, Snapshot, SystemClock};
use crate::source::SnapshotSource;
use crate::store::{JsonFileStore, SnapshotStore};

/// Where the baseline adopted by [`DeltaRateEngine::initialize`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineOrigin {
    /// Loaded from the snapshot store.
    Restored,
    /// Captured from the source just now.
    Captured,
}

/// Computes per-second rates between successive snapshots of one source.
pub struct DeltaRateEngine<S, C = SystemClock> {
    source: S,
    clock: C,
    store: Option<Box<dyn SnapshotStore + Send>>,
    previous: Option<Sample>,
}

impl<S: SnapshotSource> DeltaRateEngine<S> {
    /// Creates an uninitialized engine reading from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            clock: SystemClock,
            store: None,
            previous: None,
        }
    }

    /// Creates an engine for `source`, persisting to `config.persist_path`
    /// when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Configuration`] if `config` does not validate.
    pub fn from_config(source: S, config: &ProcConfig) -> Result<Self, RateError> {
        config.validate()?;
        let engine = Self::new(source);
        Ok(match &config.persist_path {
            Some(path) => engine.with_store(JsonFileStore::new(path)),
            None => engine,
        })
    }
}

impl<S: SnapshotSource, C: Clock> DeltaRateEngine<S, C> {
    /// Replaces the clock used to timestamp captures.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> DeltaRateEngine<S, C2> {
        DeltaRateEngine {
            source: self.source,
            clock,
            store: self.store,
            previous: self.previous,
        }
    }

    /// Persists the baseline to `store` after every successful cycle.
    #[must_use]
    pub fn with_store(mut self, store: impl SnapshotStore + Send + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.previous.is_some()
    }

    /// The sample the next [`compute`](Self::compute) will diff against.
    #[must_use]
    pub fn previous(&self) -> Option<&Sample> {
        self.previous.as_ref()
    }

    /// Establishes the baseline.
    ///
    /// A persisted sample is adopted when the store has one; otherwise a fresh
    /// snapshot is captured.
    ///
    /// # Errors
    ///
    /// - [`RateError::Configuration`] if the source cannot be read
    /// - any error from the store other than "nothing persisted yet"
    /// - [`RateError::Validation`] if the source returns malformed values
    pub fn initialize(&mut self) -> Result<BaselineOrigin, RateError> {
        if let Some(store) = &self.store {
            if let Some(sample) = store.load()? {
                let now = self.clock.now();
                if sample.timestamp > now {
                    warn!(
                        "Persisted snapshot is {:.2}s in the future, rates may degrade to raw differences",
                        sample.timestamp.as_secs_f64() - now.as_secs_f64()
                    );
                }
                debug!(
                    "Restored baseline of {} counters from store",
                    sample.snapshot.len()
                );
                self.previous = Some(sample);
                return Ok(BaselineOrigin::Restored);
            }
        }

        let sample = self.sample().map_err(|e| match e {
            RateError::SourceUnavailable { .. } => {
                RateError::Configuration(format!("metric source cannot be reached: {e}"))
            }
            other => other,
        })?;
        debug!("Captured baseline of {} counters", sample.snapshot.len());
        self.previous = Some(sample);
        Ok(BaselineOrigin::Captured)
    }

    /// Captures a new snapshot and returns the rate of every counter since the
    /// previous one, then makes the new snapshot the baseline.
    ///
    /// # Errors
    ///
    /// - [`RateError::State`] if [`initialize`](Self::initialize) was never called
    /// - [`RateError::SourceUnavailable`] / [`RateError::Validation`] from the source
    /// - [`RateError::Validation`] if a counter of the baseline is missing
    /// - any error from the store while persisting
    ///
    /// The baseline is unchanged whenever an error is returned.
    pub fn compute(&mut self) -> Result<Rates, RateError> {
        let previous = self
            .previous
            .as_ref()
            .ok_or_else(|| RateError::State("no initial statistics defined".to_string()))?;

        let current = self.sample()?;

        if let Some(missing) = previous
            .snapshot
            .keys()
            .find(|key| !current.snapshot.contains_key(key))
        {
            return Err(RateError::Validation(format!(
                "counter '{missing}' is missing from the new snapshot"
            )));
        }

        let elapsed = current.timestamp.elapsed_since(previous.timestamp);
        debug!("Computing rates over {elapsed:.2}s");

        let rates: Rates = current
            .snapshot
            .iter()
            .map(|(key, value)| {
                let per_second = match previous.snapshot.get(key) {
                    Some(prev) => rate(prev, value, elapsed),
                    None => {
                        debug!("Counter '{key}' has no baseline yet, reporting 0");
                        0.0
                    }
                };
                (key.to_string(), per_second)
            })
            .collect();

        if let Some(store) = &self.store {
            store.save(&current.snapshot, current.timestamp)?;
        }
        self.previous = Some(current);

        Ok(rates)
    }

    /// Captures a snapshot without touching the baseline.
    ///
    /// # Errors
    ///
    /// Whatever the source returns.
    pub fn raw(&self) -> Result<Snapshot, RateError> {
        self.source.capture()
    }

    fn sample(&self) -> Result<Sample, RateError> {
        let snapshot = self.source.capture()?;
        Ok(Sample::new(snapshot, self.clock.now()))
    }
}
