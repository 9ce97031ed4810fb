// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use proc_rates::{MetricFamily, RateError};

/// Errors that stop the agent before it starts reporting
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize {family} engine: {source}")]
    EngineStart {
        family: MetricFamily,
        #[source]
        source: RateError,
    },

    #[error(transparent)]
    Rate(#[from] RateError),
}
