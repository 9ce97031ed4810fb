// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use proc_rates::{
    BaselineOrigin, Clock, DeltaRateEngine, MetricFamily, ProcConfig, Rates, Snapshot,
    SnapshotSource, SystemClock,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::config::AgentConfig;
use crate::error::AgentError;

type FamilyEngine<C> = DeltaRateEngine<Box<dyn SnapshotSource + Send>, C>;

/// Values reported for one family in a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FamilyReport {
    Rates(Rates),
    Raw(Snapshot),
}

/// One line of agent output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub timestamp: f64,
    #[serde(flatten)]
    pub families: BTreeMap<MetricFamily, FamilyReport>,
}

/// Samples every configured family with its own engine.
pub struct Agent<C = SystemClock> {
    engines: Vec<(MetricFamily, FamilyEngine<C>)>,
    clock: C,
    raw: bool,
}

impl Agent {
    /// Builds one engine per family of `config`.
    pub fn new(config: &AgentConfig, proc_config: &ProcConfig) -> Result<Self, AgentError> {
        Self::with_clock(config, proc_config, SystemClock)
    }
}

impl<C: Clock + Clone> Agent<C> {
    pub fn with_clock(
        config: &AgentConfig,
        proc_config: &ProcConfig,
        clock: C,
    ) -> Result<Self, AgentError> {
        let mut engines = Vec::with_capacity(config.families.len());
        for &family in &config.families {
            let family_config = config.proc_config_for(proc_config, family)?;
            let engine = DeltaRateEngine::from_config(family.source(&family_config), &family_config)?
                .with_clock(clock.clone());
            engines.push((family, engine));
        }

        Ok(Self {
            engines,
            clock,
            raw: config.raw,
        })
    }

    /// Establishes the baseline of every engine.
    ///
    /// Returns `true` when at least one baseline was captured just now, in
    /// which case its first rates need a full interval to mean anything.
    /// Raw reports never diff, so in raw mode nothing is loaded or captured.
    pub fn initialize(&mut self) -> Result<bool, AgentError> {
        if self.raw {
            debug!("Raw mode, skipping baseline setup");
            return Ok(false);
        }

        let mut captured = false;
        for (family, engine) in &mut self.engines {
            let origin = engine
                .initialize()
                .map_err(|source| AgentError::EngineStart {
                    family: *family,
                    source,
                })?;
            debug!("{family} engine initialized from {origin:?} baseline");
            captured |= origin == BaselineOrigin::Captured;
        }
        Ok(captured)
    }

    /// Samples every family once. A family that fails is logged and left out.
    pub fn report(&mut self) -> Report {
        let timestamp = self.clock.now().as_secs_f64();
        let raw = self.raw;

        let families = self
            .engines
            .iter_mut()
            .filter_map(|(family, engine)| {
                let values = if raw {
                    engine.raw().map(FamilyReport::Raw)
                } else {
                    engine.compute().map(FamilyReport::Rates)
                };
                match values {
                    Ok(values) => Some((*family, values)),
                    Err(e) => {
                        error!("Failed to sample {family} counters: {e}");
                        None
                    }
                }
            })
            .collect();

        Report {
            timestamp,
            families,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proc_rates::Timestamp;
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<f64>>);

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_secs_f64(self.0.get())
        }
    }

    fn write_proc(dir: &Path, user: u64, pgpgin: u64, last_pid: u64) {
        fs::write(
            dir.join("stat"),
            format!("cpu  {user} 0 10 500 0 0 0 0 0 0\nprocs_running 2\nprocs_blocked 0\n"),
        )
        .unwrap();
        fs::write(
            dir.join("vmstat"),
            format!("pgpgin {pgpgin}\npgpgout 10\npswpin 0\npswpout 0\n"),
        )
        .unwrap();
        fs::write(
            dir.join("loadavg"),
            format!("0.00 0.01 0.05 2/90 {last_pid}\n"),
        )
        .unwrap();
    }

    fn proc_config(dir: &Path) -> ProcConfig {
        ProcConfig {
            base_path: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_report_rates_for_every_family() {
        let proc_dir = TempDir::new().unwrap();
        let clock = ManualClock::default();
        let mut agent = Agent::with_clock(
            &AgentConfig::default(),
            &proc_config(proc_dir.path()),
            clock.clone(),
        )
        .unwrap();

        write_proc(proc_dir.path(), 100, 1000, 500);
        assert!(agent.initialize().unwrap());

        write_proc(proc_dir.path(), 300, 1500, 520);
        clock.0.set(10.0);
        let report = agent.report();

        let line = serde_json::to_value(&report).unwrap();
        assert_eq!(line["timestamp"], 10.0);
        assert_eq!(line["cpu"]["user"], 20.0);
        assert_eq!(line["paging"]["pgpgin"], 50.0);
        assert_eq!(line["processes"]["new"], 2.0);
        assert_eq!(line["processes"]["running"], 0.0);
    }

    #[test]
    fn test_failing_family_is_omitted() {
        let proc_dir = TempDir::new().unwrap();
        let config = AgentConfig {
            families: vec![MetricFamily::Cpu, MetricFamily::Processes],
            ..Default::default()
        };
        let clock = ManualClock::default();
        let mut agent =
            Agent::with_clock(&config, &proc_config(proc_dir.path()), clock.clone()).unwrap();

        write_proc(proc_dir.path(), 100, 1000, 500);
        agent.initialize().unwrap();

        fs::write(proc_dir.path().join("loadavg"), "garbage\n").unwrap();
        clock.0.set(1.0);
        let report = agent.report();

        assert!(report.families.contains_key(&MetricFamily::Cpu));
        assert!(!report.families.contains_key(&MetricFamily::Processes));
    }

    #[test]
    fn test_raw_report() {
        let proc_dir = TempDir::new().unwrap();
        let config = AgentConfig {
            families: vec![MetricFamily::Paging],
            raw: true,
            ..Default::default()
        };
        let mut agent = Agent::with_clock(
            &config,
            &proc_config(proc_dir.path()),
            ManualClock::default(),
        )
        .unwrap();

        write_proc(proc_dir.path(), 100, 1234, 500);
        let report = agent.report();
        assert_eq!(
            report.families.get(&MetricFamily::Paging),
            Some(&FamilyReport::Raw(Snapshot::from([
                ("pgpgin", 1234),
                ("pgpgout", 10),
                ("pswpin", 0),
                ("pswpout", 0),
            ])))
        );
    }

    #[test]
    fn test_raw_mode_ignores_unusable_baseline() {
        let proc_dir = TempDir::new().unwrap();
        let state_dir = TempDir::new().unwrap();
        fs::write(state_dir.path().join("paging.json"), "{broken").unwrap();
        let config = AgentConfig {
            families: vec![MetricFamily::Paging, MetricFamily::Cpu],
            persist_dir: Some(state_dir.path().to_path_buf()),
            raw: true,
            ..Default::default()
        };
        let mut agent = Agent::with_clock(
            &config,
            &proc_config(proc_dir.path()),
            ManualClock::default(),
        )
        .unwrap();

        // Sources are not even readable yet
        assert!(!agent.initialize().unwrap());

        write_proc(proc_dir.path(), 100, 1234, 500);
        let report = agent.report();
        assert_eq!(report.families.len(), 2);
    }

    #[test]
    fn test_restored_baselines_skip_the_wait() {
        let proc_dir = TempDir::new().unwrap();
        let state_dir = TempDir::new().unwrap();
        let config = AgentConfig {
            families: vec![MetricFamily::Paging],
            persist_dir: Some(state_dir.path().to_path_buf()),
            ..Default::default()
        };
        let clock = ManualClock::default();
        write_proc(proc_dir.path(), 100, 1000, 500);

        let mut first =
            Agent::with_clock(&config, &proc_config(proc_dir.path()), clock.clone()).unwrap();
        assert!(first.initialize().unwrap());
        clock.0.set(5.0);
        first.report();
        assert!(state_dir.path().join("paging.json").exists());

        let mut second =
            Agent::with_clock(&config, &proc_config(proc_dir.path()), clock.clone()).unwrap();
        assert!(!second.initialize().unwrap());
    }

    #[test]
    fn test_initialize_failure_names_family() {
        let proc_dir = TempDir::new().unwrap();
        let config = AgentConfig {
            families: vec![MetricFamily::Processes],
            ..Default::default()
        };
        let mut agent = Agent::new(&config, &proc_config(proc_dir.path())).unwrap();
        assert!(matches!(
            agent.initialize(),
            Err(AgentError::EngineStart {
                family: MetricFamily::Processes,
                ..
            })
        ));
    }
}
