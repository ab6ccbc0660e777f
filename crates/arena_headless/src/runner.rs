//! Scenario runner implementation.
//!
//! Drives an [`Arena`] through a [`Scenario`] tick by tick and writes every
//! emitted item as one JSON object per line.

use std::io::{self, Write};

use arena_core::arena::{Arena, DeathCause, TickEvents};
use arena_core::events::CombatEvent;
use arena_core::timer::Tick;
use arena_core::world::{EntityId, ProjectileRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::{Input, Scenario, ScenarioError, Step};

/// Error type for a headless run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The scenario could not be loaded or built.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// Writing the event log failed.
    #[error("Failed to write event log: {0}")]
    Io(#[from] io::Error),
    /// Encoding a log line failed.
    #[error("Failed to encode event log line: {0}")]
    Json(#[from] serde_json::Error),
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogLine {
    /// A combat event from the player.
    Combat {
        /// Tick the event was collected on.
        tick: Tick,
        /// The event.
        event: CombatEvent,
    },
    /// An enemy died.
    Death {
        /// Tick of death.
        tick: Tick,
        /// Enemy id.
        id: EntityId,
        /// How it died.
        cause: DeathCause,
    },
    /// A projectile spawn was requested.
    Projectile {
        /// Tick of the request.
        tick: Tick,
        /// The request.
        request: ProjectileRequest,
    },
    /// Final line of a run.
    Summary(RunSummary),
}

impl LogLine {
    /// Serialize as a JSON line (with trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Outcome of one headless run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Player RNG seed.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Enemies killed.
    pub kills: u32,
    /// Weapon discharges (volleys count once).
    pub shots: u32,
    /// Whether the player ended the run alive.
    pub player_alive: bool,
    /// Final arena state hash.
    pub final_state_hash: u64,
}

/// Flatten a tick's events into log lines.
#[must_use]
pub fn log_lines(events: &TickEvents) -> Vec<LogLine> {
    let tick = events.tick;
    let combat = events
        .combat
        .iter()
        .map(|&event| LogLine::Combat { tick, event });
    let deaths = events.deaths.iter().map(|death| LogLine::Death {
        tick,
        id: death.id,
        cause: death.cause,
    });
    let projectiles = events
        .projectiles
        .iter()
        .map(|&request| LogLine::Projectile { tick, request });
    combat.chain(deaths).chain(projectiles).collect()
}

/// Steps a scenario's arena and keeps the run tallies.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    name: String,
    seed: u64,
    arena: Arena,
    steps: Vec<Step>,
    next_step: usize,
    /// Events drained from a despawned player, reported with the next tick.
    carried: Vec<CombatEvent>,
    kills: u32,
    shots: u32,
}

impl ScenarioRunner {
    /// Build the scenario's arena.
    ///
    /// # Errors
    ///
    /// Returns an error if the player configuration is invalid.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let arena = scenario.build()?;
        let mut steps = scenario.steps.clone();
        steps.sort_by_key(|step| step.tick);
        Ok(Self {
            name: scenario.name.clone(),
            seed: scenario.player.seed,
            arena,
            steps,
            next_step: 0,
            carried: Vec::new(),
            kills: 0,
            shots: 0,
        })
    }

    /// The arena being driven.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    fn apply(&mut self, input: &Input) {
        tracing::debug!(tick = self.arena.current_tick(), ?input, "Applying input");
        match input {
            Input::Action(action) => {
                if !self.arena.apply_action(*action) {
                    tracing::trace!(?action, "Action had no effect");
                }
            }
            Input::SetPose(pose) => {
                self.arena.set_player_pose((*pose).into());
            }
            Input::DamagePlayer { amount, kind } => {
                self.arena.damage_player(*amount, *kind);
            }
            Input::Respawn => {
                self.arena.respawn_player();
            }
            Input::Despawn => {
                if let Some(mut player) = self.arena.despawn_player() {
                    self.carried.extend(player.drain_events());
                }
            }
        }
    }

    /// Apply every input due at the current tick, then simulate it.
    pub fn step(&mut self) -> TickEvents {
        let now = self.arena.current_tick();
        while let Some(step) = self.steps.get(self.next_step) {
            if step.tick > now {
                break;
            }
            let input = step.input.clone();
            self.apply(&input);
            self.next_step += 1;
        }

        let mut events = self.arena.tick();
        if !self.carried.is_empty() {
            let mut combat = std::mem::take(&mut self.carried);
            combat.append(&mut events.combat);
            events.combat = combat;
        }

        self.kills += u32::try_from(events.deaths.len()).unwrap_or(u32::MAX);
        self.shots += u32::try_from(
            events
                .combat
                .iter()
                .filter(|e| matches!(e, CombatEvent::FiringEffect { .. }))
                .count(),
        )
        .unwrap_or(u32::MAX);
        events
    }

    /// Summary of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            scenario: self.name.clone(),
            seed: self.seed,
            ticks: self.arena.current_tick(),
            kills: self.kills,
            shots: self.shots,
            player_alive: self.arena.player().is_some_and(|p| !p.is_dead()),
            final_state_hash: self.arena.state_hash(),
        }
    }

    /// Run `ticks` ticks, writing the event log to `sink`, and finish with
    /// a summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or encoding a line fails.
    pub fn run<W: Write>(&mut self, ticks: u64, sink: &mut W) -> Result<RunSummary, RunError> {
        for _ in 0..ticks {
            let events = self.step();
            for line in log_lines(&events) {
                sink.write_all(line.to_json_line()?.as_bytes())?;
            }
        }
        let summary = self.summary();
        sink.write_all(LogLine::Summary(summary.clone()).to_json_line()?.as_bytes())?;
        sink.flush()?;
        Ok(summary)
    }

    /// Run `ticks` ticks without logging.
    pub fn run_silent(&mut self, ticks: u64) -> RunSummary {
        for _ in 0..ticks {
            self.step();
        }
        self.summary()
    }
}

/// Run a scenario to completion, logging to `sink`.
///
/// `ticks` overrides the scenario's own run length.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built or the log cannot be
/// written.
pub fn run_scenario<W: Write>(
    scenario: &Scenario,
    ticks: Option<u64>,
    sink: &mut W,
) -> Result<RunSummary, RunError> {
    let ticks = ticks.unwrap_or(scenario.ticks);
    tracing::info!(scenario = %scenario.name, ticks, "Running scenario");
    let mut runner = ScenarioRunner::new(scenario)?;
    let summary = runner.run(ticks, sink)?;
    tracing::info!(
        kills = summary.kills,
        shots = summary.shots,
        state_hash = summary.final_state_hash,
        "Scenario finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::combatant::Action;

    fn scenario_with(steps: Vec<Step>) -> Scenario {
        Scenario {
            ticks: 60,
            enemies: vec![arena_core::arena::EnemySpawn {
                position: arena_core::math::Vec3Fixed::from_ints(150, 0, 0),
                ..Default::default()
            }],
            steps,
            ..Scenario::default()
        }
    }

    #[test]
    fn test_run_writes_json_lines_and_summary() {
        let scenario = scenario_with(vec![Step {
            tick: 3,
            input: Input::Action(Action::RefuelKill),
        }]);
        let mut out = Vec::new();
        let summary = run_scenario(&scenario, None, &mut out).unwrap();

        assert_eq!(summary.kills, 1);
        assert_eq!(summary.ticks, 60);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<LogLine> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert!(lines.iter().any(|l| matches!(
            l,
            LogLine::Death {
                tick: 4,
                cause: DeathCause::Chainsaw,
                ..
            }
        )));
        assert_eq!(lines.last(), Some(&LogLine::Summary(summary)));
    }

    #[test]
    fn test_log_line_is_tagged() {
        let line = LogLine::Death {
            tick: 7,
            id: 3,
            cause: DeathCause::Burned,
        };
        let json = line.to_json_line().unwrap();
        assert!(json.starts_with(r#"{"kind":"death","tick":7"#));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_steps_apply_in_tick_order() {
        let scenario = scenario_with(vec![
            Step {
                tick: 5,
                input: Input::Action(Action::Dash),
            },
            Step {
                tick: 1,
                input: Input::Action(Action::Dash),
            },
        ]);
        let mut runner = ScenarioRunner::new(&scenario).unwrap();
        runner.step();
        runner.step();
        let charges = runner.arena().player().map(|p| p.dash_ability().charges());
        assert_eq!(charges, Some(1));
    }

    #[test]
    fn test_despawn_keeps_pending_events() {
        let scenario = scenario_with(vec![
            Step {
                tick: 0,
                input: Input::Action(Action::Dash),
            },
            Step {
                tick: 0,
                input: Input::Despawn,
            },
        ]);
        let mut runner = ScenarioRunner::new(&scenario).unwrap();
        let events = runner.step();

        assert!(events
            .combat
            .iter()
            .any(|e| matches!(e, CombatEvent::DashChargesChanged { .. })));
        assert!(runner.arena().player().is_none());
        assert!(!runner.summary().player_alive);
    }

    #[test]
    fn test_respawn_after_death() {
        let scenario = scenario_with(vec![
            Step {
                tick: 0,
                input: Input::DamagePlayer {
                    amount: arena_core::math::Fixed::from_num(500),
                    kind: arena_core::world::DamageKind::Generic,
                },
            },
            Step {
                tick: 2,
                input: Input::Respawn,
            },
        ]);
        let mut runner = ScenarioRunner::new(&scenario).unwrap();
        runner.step();
        assert!(!runner.summary().player_alive);
        runner.step();
        runner.step();
        assert!(runner.summary().player_alive);
    }
}
