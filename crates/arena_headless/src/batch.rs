//! Parallel scenario runs.
//!
//! Uses rayon to run one scenario many times: either unchanged, to verify
//! that every run ends on the same state hash, or under a range of player
//! RNG seeds, to see how spread randomness moves the outcome.

use std::ops::Range;
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{RunSummary, ScenarioRunner};
use crate::scenario::{Scenario, ScenarioError};

/// Result of a determinism verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks per run.
    pub ticks: u64,
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
}

impl VerifyReport {
    /// Whether every run ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Distinct hashes seen (1 when deterministic).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }
}

/// Run `scenario` `runs` times in parallel and collect the final hashes.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built.
pub fn verify_scenario(scenario: &Scenario, runs: usize) -> Result<VerifyReport, ScenarioError> {
    // Fail once up front instead of once per worker
    let template = ScenarioRunner::new(scenario)?;

    let hashes: Vec<u64> = (0..runs)
        .into_par_iter()
        .map(|run| {
            let mut runner = template.clone();
            let summary = runner.run_silent(scenario.ticks);
            debug!(run, hash = summary.final_state_hash, "Verification run finished");
            summary.final_state_hash
        })
        .collect();

    let report = VerifyReport {
        scenario: scenario.name.clone(),
        ticks: scenario.ticks,
        hashes,
    };
    if report.is_deterministic() {
        info!(scenario = %report.scenario, runs, "All runs match");
    } else {
        warn!(
            scenario = %report.scenario,
            unique = report.unique_hashes().len(),
            "Runs diverged"
        );
    }
    Ok(report)
}

/// Aggregate over a seed sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of runs.
    pub runs: usize,
    /// Mean kills per run.
    pub mean_kills: f64,
    /// Fewest kills in any run.
    pub min_kills: u32,
    /// Most kills in any run.
    pub max_kills: u32,
    /// Runs the player survived.
    pub survived: usize,
}

impl BatchSummary {
    /// Summarize individual runs.
    #[must_use]
    pub fn from_runs(runs: &[RunSummary]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let total: u64 = runs.iter().map(|r| u64::from(r.kills)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean_kills = total as f64 / runs.len() as f64;
        Self {
            runs: runs.len(),
            mean_kills,
            min_kills: runs.iter().map(|r| r.kills).min().unwrap_or(0),
            max_kills: runs.iter().map(|r| r.kills).max().unwrap_or(0),
            survived: runs.iter().filter(|r| r.player_alive).count(),
        }
    }
}

/// Results from a seed sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name.
    pub scenario: String,
    /// Seeds swept (half-open).
    pub seeds: Range<u64>,
    /// One summary per seed, in seed order.
    pub runs: Vec<RunSummary>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Re-run `scenario` once per seed in `seeds`, in parallel.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built.
pub fn run_batch(scenario: &Scenario, seeds: Range<u64>) -> Result<BatchResults, ScenarioError> {
    let start = Instant::now();
    info!(scenario = %scenario.name, ?seeds, "Starting seed sweep");

    let runs: Vec<RunSummary> = seeds
        .clone()
        .into_par_iter()
        .map(|seed| {
            let mut runner = ScenarioRunner::new(&scenario.with_seed(seed))?;
            Ok(runner.run_silent(scenario.ticks))
        })
        .collect::<Result<_, ScenarioError>>()?;

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        runs = summary.runs,
        mean_kills = summary.mean_kills,
        duration_seconds,
        "Seed sweep finished"
    );

    Ok(BatchResults {
        scenario: scenario.name.clone(),
        seeds,
        runs,
        summary,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauntlet_verifies() {
        let mut scenario = Scenario::gauntlet();
        scenario.ticks = 400;
        let report = verify_scenario(&scenario, 4).unwrap();
        assert_eq!(report.hashes.len(), 4);
        assert!(report.is_deterministic());
        assert_eq!(report.unique_hashes().len(), 1);
    }

    #[test]
    fn test_batch_runs_every_seed_in_order() {
        let mut scenario = Scenario::gauntlet();
        scenario.ticks = 200;
        let results = run_batch(&scenario, 10..14).unwrap();

        let seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
        assert_eq!(results.summary.runs, 4);
        assert!(results.summary.min_kills <= results.summary.max_kills);
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(BatchSummary::from_runs(&[]), BatchSummary::default());
    }

    #[test]
    fn test_results_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep").join("results.json");
        let mut scenario = Scenario::gauntlet();
        scenario.ticks = 30;
        let results = run_batch(&scenario, 0..2).unwrap();

        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.runs, results.runs);
        assert_eq!(loaded.seeds, 0..2);
    }
}
