// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-second rates from cumulative `/proc` counters.
//!
//! Kernel counters such as pages paged in or CPU ticks only make sense as a
//! rate. A [`DeltaRateEngine`] captures a baseline [`Snapshot`] from a
//! [`SnapshotSource`], and every later [`compute`](DeltaRateEngine::compute)
//! diffs a fresh capture against it and divides by the elapsed time. With a
//! [`SnapshotStore`] configured the baseline survives process restarts, so a
//! short-lived process invoked periodically still reports true rates.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod engine;
pub mod errors;
pub mod family;
pub mod proc;
pub mod rate;
pub mod snapshot;
pub mod source;
pub mod store;

pub use config::ProcConfig;
pub use engine::{BaselineOrigin, DeltaRateEngine};
pub use errors::RateError;
pub use family::MetricFamily;
pub use rate::Rates;
pub use snapshot::{Clock, Sample, Snapshot, SystemClock, Timestamp};
pub use source::SnapshotSource;
pub use store::{JsonFileStore, SnapshotStore};
