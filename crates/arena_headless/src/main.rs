//! Headless arena runner.
//!
//! Runs arena scenarios without graphics. The event log goes to stdout (or
//! `--output`), logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in gauntlet
//! cargo run -p arena_headless
//!
//! # Run a scenario file
//! cargo run -p arena_headless -- run --scenario scenarios/gauntlet.ron --output log.jsonl
//!
//! # Check that 16 parallel runs agree
//! cargo run -p arena_headless -- verify --scenario scenarios/gauntlet.ron --runs 16
//!
//! # Sweep player RNG seeds
//! cargo run -p arena_headless -- batch --seeds 0..100 --output results/sweep.json
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arena_headless::{run_batch, run_scenario, verify_scenario, Scenario};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless arena runner for CI and tuning")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario and write its event log
    Run {
        /// Scenario file to load (built-in gauntlet if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Write the event log here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the scenario's tick count
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Run a scenario many times in parallel and compare final hashes
    Verify {
        /// Scenario file to load (built-in gauntlet if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of runs
        #[arg(short, long, default_value = "8")]
        runs: usize,
    },

    /// Re-run a scenario under a range of player RNG seeds
    Batch {
        /// Scenario file to load (built-in gauntlet if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seeds to sweep, as `start..end`
        #[arg(long, value_parser = parse_seed_range)]
        seeds: Range<u64>,

        /// Write the JSON summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_seed_range(s: &str) -> Result<Range<u64>, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected start..end, got '{s}'"))?;
    let start: u64 = start
        .trim()
        .parse()
        .map_err(|e| format!("bad range start: {e}"))?;
    let end: u64 = end
        .trim()
        .parse()
        .map_err(|e| format!("bad range end: {e}"))?;
    if end <= start {
        return Err(format!("empty seed range {start}..{end}"));
    }
    Ok(start..end)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the event log
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            output,
            ticks,
        }) => cmd_run(scenario.as_deref(), output.as_deref(), ticks),
        Some(Commands::Verify { scenario, runs }) => cmd_verify(scenario.as_deref(), runs),
        Some(Commands::Batch {
            scenario,
            seeds,
            output,
        }) => cmd_batch(scenario.as_deref(), seeds, output.as_deref()),
        None => cmd_run(None, None, None),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario, String> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading scenario");
            Scenario::load(path).map_err(|e| e.to_string())
        }
        None => Ok(Scenario::gauntlet()),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, String> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create {}: {e}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn cmd_run(
    scenario: Option<&Path>,
    output: Option<&Path>,
    ticks: Option<u64>,
) -> Result<ExitCode, String> {
    let scenario = load_scenario(scenario)?;
    let mut sink = open_output(output)?;
    let summary = run_scenario(&scenario, ticks, &mut sink).map_err(|e| e.to_string())?;
    tracing::info!(
        scenario = %summary.scenario,
        kills = summary.kills,
        player_alive = summary.player_alive,
        "Run complete"
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_verify(scenario: Option<&Path>, runs: usize) -> Result<ExitCode, String> {
    let scenario = load_scenario(scenario)?;
    let report = verify_scenario(&scenario, runs).map_err(|e| e.to_string())?;

    if report.is_deterministic() {
        println!(
            "{}: {} runs of {} ticks agree on {:#018x}",
            report.scenario,
            report.hashes.len(),
            report.ticks,
            report.hashes.first().copied().unwrap_or_default()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}: runs diverged", report.scenario);
        for (run, hash) in report.hashes.iter().enumerate() {
            println!("  run {run}: {hash:#018x}");
        }
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_batch(
    scenario: Option<&Path>,
    seeds: Range<u64>,
    output: Option<&Path>,
) -> Result<ExitCode, String> {
    let scenario = load_scenario(scenario)?;
    let results = run_batch(&scenario, seeds).map_err(|e| e.to_string())?;

    match output {
        Some(path) => {
            results
                .save(path)
                .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
            tracing::info!(path = %path.display(), "Saved batch results");
        }
        None => {
            let json = serde_json::to_string_pretty(&results).map_err(|e| e.to_string())?;
            println!("{json}");
        }
    }

    let summary = &results.summary;
    eprintln!(
        "{} seeds: kills {}..={} (mean {:.2}), survived {}/{}",
        summary.runs,
        summary.min_kills,
        summary.max_kills,
        summary.mean_kills,
        summary.survived,
        summary.runs
    );
    Ok(ExitCode::SUCCESS)
}
