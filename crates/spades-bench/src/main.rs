use std::path::PathBuf;

use clap::Parser;

use spades_bench::config::{BenchmarkConfig, ResolvedOutputs};
use spades_bench::logging::init_logging;
use spades_bench::training::TrainingRunner;

/// Self-play training and benchmarking harness for Spades agents.
#[derive(Debug, Parser)]
#[command(
    name = "spades-bench",
    author,
    version,
    about = "Seeded Spades self-play trainer and benchmark"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for seating and deals.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no games are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.games.count = games;
    }

    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let agent_count = config.agents.len();
    let run_id = config.run_id.clone();
    let games = config.games.count;

    println!(
        "Loaded configuration '{run_id}' with {agent_count} agents ({games} game{}, {} scoring)",
        if games == 1 { "" } else { "s" },
        config.scoring.as_str()
    );

    if cli.validate_only {
        TrainingRunner::new(config, outputs)?;
        println!("Validation-only mode: no games played.");
        return Ok(());
    }

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = TrainingRunner::new(config, outputs)?;

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {} games (seed {}) → {} rows at {}",
        summary.games_played,
        summary.seed,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Learning curve: {}", plot_path.display());
    }
    if let Some(trace_path) = summary.trace_path.as_ref() {
        println!("Game trace: {}", trace_path.display());
    }
    for snapshot in &summary.snapshot_paths {
        println!("Snapshot: {}", snapshot.display());
    }
    if let Some(guard) = logging_guard.as_ref() {
        println!("Telemetry log: {}", guard.telemetry_path.display());
    }

    Ok(())
}
