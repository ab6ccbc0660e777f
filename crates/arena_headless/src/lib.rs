//! Headless arena runner for CI and tuning.
//!
//! Runs scripted arena scenarios without graphics or input devices. This
//! enables:
//!
//! - **Event logs**: every combat event, death and projectile request as
//!   JSON lines, for diffing two builds
//! - **Determinism checks**: the same scenario run many times in parallel
//!   must end on one state hash
//! - **Seed sweeps**: re-run a scenario under a range of player RNG seeds
//!
//! # Example
//!
//! ```bash
//! # Run the built-in gauntlet and print the event log
//! cargo run -p arena_headless
//!
//! # Run a scenario file for 900 ticks
//! cargo run -p arena_headless -- run --scenario scenarios/shotgun_crowd.ron --ticks 900
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify --runs 16
//!
//! # Sweep seeds
//! cargo run -p arena_headless -- batch --seeds 0..64 --output sweep.json
//! ```

pub mod batch;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_scenario, BatchResults, BatchSummary, VerifyReport};
pub use runner::{log_lines, run_scenario, LogLine, RunError, RunSummary, ScenarioRunner};
pub use scenario::{BodyPlacement, Input, PoseSetup, Scenario, ScenarioError, Step};
