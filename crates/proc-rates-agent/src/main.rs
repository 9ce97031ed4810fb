// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod agent;
mod config;
mod error;

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use tokio::time::{interval, sleep, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use proc_rates::ProcConfig;

use crate::agent::{Agent, Report};
use crate::config::AgentConfig;

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match AgentConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error creating agent config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = match EnvFilter::try_new(&config.log_level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Could not parse log level in configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let proc_config = match ProcConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating /proc config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut agent = match Agent::new(&config, &proc_config) {
        Ok(agent) => agent,
        Err(e) => {
            error!("Error creating engines: {e}");
            return ExitCode::FAILURE;
        }
    };

    let needs_warmup = match agent.initialize() {
        Ok(captured) => captured,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {e}");
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    if config.oneshot {
        // Fresh baselines need one interval before their rates mean anything
        if needs_warmup {
            debug!("Waiting {}s for a fresh baseline", config.interval_secs);
            tokio::select! {
                () = sleep(config.interval()) => {}
                () = cancel_token.cancelled() => return ExitCode::SUCCESS,
            }
        }
        return match emit(&agent.report()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Failed to write report: {e}");
                ExitCode::FAILURE
            }
        };
    }

    info!(
        "Sampling {} families every {}s",
        config.families.len(),
        config.interval_secs
    );

    let mut ticks = report_interval(config.interval());
    ticks.tick().await; // discard first tick, which is instantaneous

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if let Err(e) = emit(&agent.report()) {
                    error!("Failed to write report: {e}");
                    return ExitCode::FAILURE;
                }
            }
            () = cancel_token.cancelled() => {
                debug!("Stopping sampling loop");
                return ExitCode::SUCCESS;
            }
        }
    }
}

/// Ticks every `period`. After a stall the schedule restarts from the late
/// tick instead of bursting, so no report covers a much shorter window.
fn report_interval(period: Duration) -> Interval {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticks
}

/// Writes one report as a JSON line on stdout.
fn emit(report: &Report) -> io::Result<()> {
    let line = serde_json::to_string(report)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_report_interval_does_not_burst_after_stall() {
        let period = Duration::from_millis(50);
        let mut ticks = report_interval(period);
        assert_eq!(ticks.missed_tick_behavior(), MissedTickBehavior::Delay);
        ticks.tick().await;

        // Block the runtime for several periods
        std::thread::sleep(period * 4);

        ticks.tick().await;
        let late = Instant::now();
        ticks.tick().await;
        assert!(late.elapsed() >= period - Duration::from_millis(5));
    }
}
