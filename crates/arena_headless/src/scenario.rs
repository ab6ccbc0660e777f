//! Scenario loading and configuration.
//!
//! Scenarios define the starting arena for a headless run: the player's
//! loadout and pose, enemy and body placements, and a tick-stamped script of
//! inputs.

use std::path::Path;

use arena_core::arena::{Arena, EnemySpawn};
use arena_core::combatant::{Action, Pose};
use arena_core::config::CombatantConfig;
use arena_core::error::GameError;
use arena_core::math::{fixed_decimal, vec3_decimal, Fixed, Vec3Fixed};
use arena_core::timer::Tick;
use arena_core::world::DamageKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The player configuration was rejected.
    #[error("Invalid player configuration: {0}")]
    InvalidPlayer(#[from] GameError),
}

/// Player pose as written in scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseSetup {
    /// World position.
    #[serde(with = "vec3_decimal")]
    pub position: Vec3Fixed,
    /// Facing.
    #[serde(with = "vec3_decimal")]
    pub forward: Vec3Fixed,
    /// Movement input; zero when standing still.
    #[serde(with = "vec3_decimal")]
    pub movement_input: Vec3Fixed,
    /// On the ground.
    pub grounded: bool,
}

impl Default for PoseSetup {
    fn default() -> Self {
        Pose::default().into()
    }
}

impl From<Pose> for PoseSetup {
    fn from(pose: Pose) -> Self {
        Self {
            position: pose.position,
            forward: pose.forward,
            movement_input: pose.movement_input,
            grounded: pose.grounded,
        }
    }
}

impl From<PoseSetup> for Pose {
    fn from(setup: PoseSetup) -> Self {
        Self {
            position: setup.position,
            forward: setup.forward,
            movement_input: setup.movement_input,
            grounded: setup.grounded,
        }
    }
}

/// Placement of a physics body at scenario start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyPlacement {
    /// World position.
    #[serde(with = "vec3_decimal")]
    pub position: Vec3Fixed,
    /// Collision radius.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,
    /// Mass.
    #[serde(with = "fixed_decimal")]
    pub mass: Fixed,
    /// Whether shots push it.
    pub simulating: bool,
}

impl Default for BodyPlacement {
    fn default() -> Self {
        Self {
            position: Vec3Fixed::ZERO,
            radius: Fixed::from_num(30),
            mass: Fixed::from_num(50),
            simulating: true,
        }
    }
}

/// One scripted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Input {
    /// A player action.
    Action(Action),
    /// Move or turn the player.
    SetPose(PoseSetup),
    /// Hurt the player.
    DamagePlayer {
        /// Damage amount.
        #[serde(with = "fixed_decimal")]
        amount: Fixed,
        /// Damage classification.
        #[serde(default)]
        kind: DamageKind,
    },
    /// Respawn the player at full strength.
    Respawn,
    /// Remove the player (cancels its timers).
    Despawn,
}

/// An input applied just before a tick is simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Tick at which the input applies.
    pub tick: Tick,
    /// What to do.
    pub input: Input,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Ticks to simulate.
    pub ticks: u64,
    /// Player loadout and tuning.
    pub player: CombatantConfig,
    /// Player starting pose.
    pub pose: PoseSetup,
    /// Enemies to spawn, in id order.
    pub enemies: Vec<EnemySpawn>,
    /// Bodies to spawn after the enemies.
    pub bodies: Vec<BodyPlacement>,
    /// Scripted inputs.
    pub steps: Vec<Step>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Empty Arena".to_string(),
            description: "The default player alone for ten seconds".to_string(),
            ticks: 600,
            player: CombatantConfig::default(),
            pose: PoseSetup::default(),
            enemies: Vec::new(),
            bodies: Vec::new(),
            steps: Vec::new(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.player.validate()?;
        Ok(scenario)
    }

    /// A close-quarters wave: a staggered brute, a pack in the flame cone,
    /// a crate to push, and a script that uses every ability.
    #[must_use]
    pub fn gauntlet() -> Self {
        let at = |x: i32, y: i32| Vec3Fixed::from_ints(x, y, 0);
        let step = |tick: Tick, input: Input| Step { tick, input };
        let action = |tick: Tick, action: Action| step(tick, Input::Action(action));

        Self {
            name: "Gauntlet".to_string(),
            description: "Every ability against a mixed pack".to_string(),
            ticks: 1200,
            player: CombatantConfig::default(),
            pose: PoseSetup::default(),
            enemies: vec![
                EnemySpawn {
                    position: at(200, 0),
                    health: Fixed::from_num(25),
                    ..EnemySpawn::default()
                },
                EnemySpawn {
                    position: at(450, 20),
                    ..EnemySpawn::default()
                },
                EnemySpawn {
                    position: at(500, -80),
                    ..EnemySpawn::default()
                },
                EnemySpawn {
                    position: at(160, 40),
                    ..EnemySpawn::default()
                },
                EnemySpawn {
                    position: at(-300, 0),
                    health: Fixed::from_num(300),
                    ..EnemySpawn::default()
                },
            ],
            bodies: vec![BodyPlacement {
                position: at(300, -200),
                ..BodyPlacement::default()
            }],
            steps: vec![
                action(0, Action::Execute),
                action(2, Action::RefuelKill),
                action(5, Action::AreaAttack),
                action(10, Action::SelectWeapon(1)),
                action(11, Action::StartFiring),
                action(90, Action::StopFiring),
                action(100, Action::Dash),
                action(101, Action::Jump),
                action(110, Action::Jump),
                action(140, Action::Land),
                step(
                    200,
                    Input::DamagePlayer {
                        amount: Fixed::from_num(35),
                        kind: DamageKind::Generic,
                    },
                ),
                step(
                    300,
                    Input::SetPose(PoseSetup {
                        forward: Vec3Fixed::from_ints(-1, 0, 0),
                        ..PoseSetup::default()
                    }),
                ),
                action(301, Action::ScrollWeapon(1)),
                action(302, Action::StartFiring),
                action(303, Action::StopFiring),
                action(400, Action::StartFiring),
                action(401, Action::StopFiring),
                action(1000, Action::AreaAttack),
            ],
        }
    }

    /// Build the arena this scenario starts from.
    pub fn build(&self) -> Result<Arena, ScenarioError> {
        let mut arena = Arena::new();
        arena.spawn_player(self.player.clone())?;
        arena.set_player_pose(self.pose.into());
        for enemy in &self.enemies {
            arena.spawn_enemy(enemy.clone());
        }
        for body in &self.bodies {
            arena.spawn_body(body.position, body.radius, body.mass, body.simulating);
        }
        Ok(arena)
    }

    /// Same scenario with a different player RNG seed.
    #[must_use]
    pub fn with_seed(&self, seed: u64) -> Self {
        let mut scenario = self.clone();
        scenario.player.seed = seed;
        scenario
    }
}
