mod seeds;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use matchem_solver::{StrategyKind, TrialError, TrialSetup, run_trial};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs, StrategyConfig};

use seeds::TrialSeeds;

/// Primary entry point for orchestrating benchmark runs.
pub struct SimulationRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    strategies: Vec<StrategyBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub trials: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub headlines: Vec<StrategyHeadline>,
    pub elapsed: Duration,
}

/// Per-strategy headline figure for console output.
pub struct StrategyHeadline {
    pub name: String,
    pub avg_rounds: f64,
}

impl SimulationRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let strategies = StrategyBlueprint::from_configs(&config.strategies);

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            strategies,
        })
    }

    /// Execute the benchmark, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let started = Instant::now();
        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let seeds = TrialSeeds::derive(
            self.config.simulation.seed.unwrap_or(0),
            self.config.simulation.trials,
        );
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        for strategy in &self.strategies {
            let records = self.run_strategy(strategy, seeds.as_slice())?;

            for record in &records {
                analytics.record_trial(&strategy.name, record.rounds)?;
                rows_written +=
                    write_trial_row(&mut writer, &self.config, &strategy.name, record)?;
            }

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                let total: u64 = records.iter().map(|r| u64::from(r.rounds)).sum();
                event!(
                    target: "matchem_bench::runner",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    strategy = %strategy.name,
                    trials = records.len(),
                    avg_rounds = total as f64 / records.len().max(1) as f64
                );
            }
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let headlines = summary
            .strategies
            .iter()
            .map(|report| StrategyHeadline {
                name: report.name.clone(),
                avg_rounds: report.avg_rounds,
            })
            .collect();

        Ok(RunSummary {
            trials: self.config.simulation.trials,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            headlines,
            elapsed: started.elapsed(),
        })
    }

    /// Run every trial for one strategy across the worker pool. The seed
    /// schedule is fixed up front, so the outcome does not depend on the
    /// thread count.
    fn run_strategy(
        &self,
        strategy: &StrategyBlueprint,
        seeds: &[u64],
    ) -> Result<Vec<TrialRecord>, RunnerError> {
        let set_size = self.config.simulation.set_size;
        let check_invariants = self.config.simulation.validate;

        seeds
            .par_iter()
            .copied()
            .enumerate()
            .map(|(trial_index, seed)| {
                let setup = TrialSetup::seeded(set_size, seed)
                    .map_err(|err| RunnerError::trial(&strategy.name, trial_index, err))?
                    .check_invariants(check_invariants);
                let mut policy = strategy.kind.spawn();
                let started = Instant::now();
                let outcome = run_trial(&setup, policy.as_mut())
                    .map_err(|err| RunnerError::trial(&strategy.name, trial_index, err))?;

                Ok(TrialRecord {
                    trial_index,
                    seed,
                    rounds: outcome.rounds,
                    elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                })
            })
            .collect()
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_trial_row(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    strategy: &str,
    record: &TrialRecord,
) -> Result<usize, RunnerError> {
    let row = TrialLogRow {
        run_id: config.run_id.clone(),
        trial_id: format!("T{:05}", record.trial_index),
        trial_index: record.trial_index,
        trial_seed: record.seed,
        strategy: strategy.to_string(),
        set_size: config.simulation.set_size,
        rounds: record.rounds,
        elapsed_ms: record.elapsed_ms,
    };

    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(1)
}

struct TrialRecord {
    trial_index: usize,
    seed: u64,
    rounds: u32,
    elapsed_ms: f64,
}

struct StrategyBlueprint {
    name: String,
    kind: StrategyKind,
}

impl StrategyBlueprint {
    fn from_configs(configs: &[StrategyConfig]) -> Vec<Self> {
        configs
            .iter()
            .map(|config| Self {
                name: config.name.clone(),
                kind: config.kind.kind(),
            })
            .collect()
    }
}

#[derive(Serialize)]
struct TrialLogRow {
    run_id: String,
    trial_id: String,
    trial_index: usize,
    trial_seed: u64,
    strategy: String,
    set_size: usize,
    rounds: u32,
    elapsed_ms: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("trial {trial} failed for strategy '{strategy}': {message}")]
    Trial {
        strategy: String,
        trial: usize,
        message: String,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

impl RunnerError {
    fn trial(strategy: &str, trial: usize, err: TrialError) -> Self {
        RunnerError::Trial {
            strategy: strategy.to_string(),
            trial,
            message: format!("{err:?}"),
        }
    }
}
