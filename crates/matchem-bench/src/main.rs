use std::path::PathBuf;

use clap::Parser;

use matchem_bench::config::{BenchmarkConfig, ResolvedOutputs};
use matchem_bench::logging::init_logging;
use matchem_bench::runner::SimulationRunner;

/// Benchmarking harness for hidden-pairing solver strategies.
#[derive(Debug, Parser)]
#[command(
    name = "matchem-bench",
    author,
    version,
    about = "Deterministic matching-puzzle benchmark harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/matchem.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of trials to run.
    #[arg(long, value_name = "TRIALS")]
    trials: Option<usize>,

    /// Override the master RNG seed for hidden-assignment generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of items per side.
    #[arg(long, value_name = "SIZE")]
    set_size: Option<usize>,

    /// Exit after validating the configuration (no benchmark is run).
    #[arg(long)]
    validate_only: bool,

    /// Enable per-round trial diagnostics regardless of config.
    #[arg(long)]
    log_trial_details: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(trials) = cli.trials {
        config.simulation.trials = trials;
    }

    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }

    if let Some(set_size) = cli.set_size {
        config.simulation.set_size = set_size;
    }

    if cli.log_trial_details {
        config.logging.trial_details = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let strategy_count = config.strategies.len();
    let run_id = config.run_id.clone();
    let trials = config.simulation.trials;
    let set_size = config.simulation.set_size;

    println!(
        "Loaded configuration '{run_id}' with {strategy_count} strateg{} ({trials} trials, set size {set_size})",
        if strategy_count == 1 { "y" } else { "ies" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SimulationRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: benchmark execution skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Benchmark complete for '{run_id}': {} trials → {} rows at {} ({:.2}s)",
        summary.trials,
        summary.rows_written,
        summary.jsonl_path.display(),
        summary.elapsed.as_secs_f64()
    );
    for headline in &summary.headlines {
        println!(
            "  {}: {:.3} avg rounds per trial",
            headline.name, headline.avg_rounds
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Rounds delta plot: {}", plot_path.display());
    }

    Ok(())
}
