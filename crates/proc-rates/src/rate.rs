// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-key rate rule applied to every counter family.
//!
//! Given a previous value `a`, a current value `b` and the elapsed seconds
//! `Δ` between the two readings:
//!
//! ```text
//! b <= a          -> 0.00            (unchanged, or reset / wraparound)
//! b >  a, Δ >  0  -> (b - a) / Δ     (rounded to two decimals)
//! b >  a, Δ <= 0  -> b - a           (no division by zero)
//! ```
//!
//! A counter that moved backwards is read as a reset (reboot, overflow) and
//! reported as zero. The true wraparound magnitude is not reconstructed.

use std::collections::BTreeMap;

use tracing::trace;

/// Per-second rates keyed like the snapshot they were computed from.
pub type Rates = BTreeMap<String, f64>;

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Applies the rate rule to a single counter.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rate(previous: u64, current: u64, elapsed_secs: f64) -> f64 {
    if current <= previous {
        if current < previous {
            trace!("Counter went backwards ({previous} -> {current}), treating as reset");
        }
        return 0.0;
    }

    let delta = (current - previous) as f64;
    if elapsed_secs > 0.0 {
        round2(delta / elapsed_secs)
    } else {
        delta
    }
}
