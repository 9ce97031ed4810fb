// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The capability every counter family implements.

use crate::errors::RateError;
use crate::snapshot::Snapshot;

/// Produces a snapshot of live counter values.
///
/// Implementations must read current state on every call (no caching) and
/// must fail rather than return a partial snapshot: an unreadable file is
/// [`RateError::SourceUnavailable`], a malformed value or missing field is
/// [`RateError::Validation`].
pub trait SnapshotSource {
    /// Captures the current counter values.
    ///
    /// # Errors
    ///
    /// See the trait documentation.
    fn capture(&self) -> Result<Snapshot, RateError>;
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for Box<T> {
    fn capture(&self) -> Result<Snapshot, RateError> {
        (**self).capture()
    }
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for &T {
    fn capture(&self) -> Result<Snapshot, RateError> {
        (**self).capture()
    }
}
