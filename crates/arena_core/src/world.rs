//! Interfaces to the world the combatant lives in.
//!
//! The core never owns other actors. Everything it needs from the
//! surrounding runtime goes through two traits:
//!
//! - [`SpatialQuery`] - enumerate hostiles, cast rays, push physics bodies,
//!   request projectile spawns
//! - [`DamageSink`] - apply damage and statuses, resolve special kills
//!
//! [`World`] is the union of both and is what the combatant is handed.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec3Fixed};

/// Unique identifier for combatants and hostile entities.
pub type EntityId = u64;

/// Identifier for a physics-simulated body that can receive impulses.
pub type BodyId = u64;

/// Damage classification forwarded with every damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DamageKind {
    /// Shotgun pellets, rifle rounds.
    #[default]
    Ballistic,
    /// Rockets and grenades.
    Explosive,
    /// Burning status ticks.
    Fire,
    /// Anything else: environment, scripted.
    Generic,
}

/// Live snapshot of a hostile entity, as seen by targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hostile {
    /// Entity identifier.
    pub id: EntityId,
    /// World position.
    pub position: Vec3Fixed,
    /// Whether the entity is still alive.
    pub alive: bool,
    /// Whether the entity is staggered (eligible for an execute).
    pub staggered: bool,
}

/// Nearest blocking hit reported by a ray cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayHit {
    /// Impact point.
    pub point: Vec3Fixed,
    /// Surface normal at the impact point.
    pub normal: Vec3Fixed,
    /// Combatant that was struck, if any.
    pub entity: Option<EntityId>,
    /// Physics body that was struck, if it is simulating physics.
    pub body: Option<BodyId>,
}

/// Request for the runtime to spawn a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileRequest {
    /// Firing combatant (the projectile must not hit it).
    pub owner: EntityId,
    /// Spawn point.
    pub origin: Vec3Fixed,
    /// Unit flight direction.
    pub direction: Vec3Fixed,
    /// Flight speed in units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage on impact.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Damage classification.
    pub kind: DamageKind,
}

/// Spatial and physics queries against the live world.
pub trait SpatialQuery {
    /// Every hostile entity currently in the world, alive or not.
    fn hostiles(&self) -> Vec<Hostile>;

    /// Cast a ray along the segment `start..end` and report the nearest
    /// blocking hit.
    fn ray_cast(&self, start: Vec3Fixed, end: Vec3Fixed) -> Option<RayHit>;

    /// Push a physics body with `impulse` applied at `point`.
    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3Fixed, point: Vec3Fixed);

    /// Spawn a projectile.
    fn spawn_projectile(&mut self, request: ProjectileRequest);
}

/// Damage and status application on other entities.
///
/// Targets run their own mitigation; the core only states intent.
pub trait DamageSink {
    /// Apply `amount` damage of `kind` to `target`.
    fn apply_damage(&mut self, target: EntityId, amount: Fixed, kind: DamageKind);

    /// Set `target` burning for `duration` ticks.
    fn apply_burning(&mut self, target: EntityId, duration: u32);

    /// Resolve `target` as executed (bypasses normal damage).
    fn resolve_executed(&mut self, target: EntityId);

    /// Resolve `target` as killed by the chainsaw (bypasses normal damage).
    fn resolve_chainsaw_kill(&mut self, target: EntityId);
}

/// Everything a combatant needs from the world.
pub trait World: SpatialQuery + DamageSink {}

impl<T: SpatialQuery + DamageSink + ?Sized> World for T {}
