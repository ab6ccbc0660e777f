//! # Arena Core
//!
//! Deterministic combat core for Hell Wave Arena.
//!
//! This crate contains **only** the rules of a player combatant:
//! - Weapon fire, reload and ammunition bookkeeping
//! - Charge- and cooldown-based abilities (dash, chainsaw, area attack)
//! - Proximity special actions against hostiles (execute, refuel-kill)
//!
//! It does no rendering, no IO and no input handling. Time arrives as
//! typed timer events, the world is reached through the
//! [`SpatialQuery`](world::SpatialQuery) and [`DamageSink`](world::DamageSink)
//! traits, and everything observable leaves as a
//! [`CombatEvent`](events::CombatEvent).
//!
//! ## Crate Structure
//!
//! - [`math`] - Fixed-point math, deterministic trig, seeded RNG
//! - [`pool`] - Clamped resource pools
//! - [`timer`] - Timer service trait, reference queue, per-owner tables
//! - [`config`] - Serde/RON tuning and weapon presets
//! - [`dash`] - Dash charge state machine
//! - [`weapon`] - Weapon fire/reload state machine
//! - [`targeting`] - Nearest / cone queries over hostiles
//! - [`combatant`] - Ability orchestrator
//! - [`arena`] - Reference host used by the headless runner and tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod arena;
pub mod combatant;
pub mod config;
pub mod dash;
pub mod error;
pub mod events;
pub mod math;
pub mod pool;
pub mod targeting;
pub mod timer;
pub mod weapon;
pub mod world;

#[cfg(test)]
mod test_world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::arena::{Arena, DeathCause, EnemyDeath, EnemySpawn, TickEvents};
    pub use crate::combatant::{Action, Combatant, Pose};
    pub use crate::config::{CombatantConfig, FireMode, WeaponDescriptor};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{CombatEvent, EventQueue};
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::pool::{PoolChange, ResourcePool};
    pub use crate::timer::{TimerKind, TimerQueue, TimerService, TICK_RATE};
    pub use crate::weapon::{FireOutcome, Weapon, WeaponState};
    pub use crate::world::{DamageKind, DamageSink, EntityId, Hostile, SpatialQuery, World};
}
