//! Reference arena host.
//!
//! [`Arena`] is the smallest runtime a [`Combatant`] can live in: it owns
//! the clock ([`TimerQueue`]), one player, a set of hostile [`Enemy`]
//! spheres and physics [`Body`] spheres, and implements the
//! [`SpatialQuery`] and [`DamageSink`] collaborator traits on top of them.
//! The headless runner and the integration tests drive it.
//!
//! # Determinism
//!
//! - Fixed-point math throughout ([`Fixed`])
//! - Seeded spread RNG owned by the combatant
//! - Enemies and bodies are kept in spawn order; every scan uses that order
//! - Timers fire in due-tick then scheduling order
//!
//! Two arenas fed the same actions on the same ticks produce the same
//! [`Arena::state_hash`] sequence.
//!
//! # Example
//!
//! ```
//! use arena_core::arena::{Arena, EnemySpawn};
//! use arena_core::combatant::Action;
//! use arena_core::config::CombatantConfig;
//! use arena_core::math::Vec3Fixed;
//!
//! let mut arena = Arena::new();
//! arena.spawn_player(CombatantConfig::default()).unwrap();
//! arena.spawn_enemy(EnemySpawn {
//!     position: Vec3Fixed::from_ints(300, 0, 0),
//!     ..EnemySpawn::default()
//! });
//!
//! assert!(arena.apply_action(Action::AreaAttack));
//! let events = arena.tick();
//! assert_eq!(events.tick, 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combatant::{Action, Combatant, Pose};
use crate::config::CombatantConfig;
use crate::error::{GameError, Result};
use crate::events::CombatEvent;
use crate::math::{
    fixed_decimal, fixed_serde, fixed_sqrt, vec3_decimal, Fixed, Vec3Fixed, WideFixed,
};
use crate::pool::ResourcePool;
use crate::timer::{Tick, TimerQueue, TimerService, TICK_RATE};
use crate::weapon::FireOutcome;
use crate::world::{
    BodyId, DamageKind, DamageSink, EntityId, Hostile, ProjectileRequest, RayHit, SpatialQuery,
};

/// Parameters for spawning an enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySpawn {
    /// World position.
    #[serde(with = "vec3_decimal")]
    pub position: Vec3Fixed,
    /// Collision sphere radius.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,
    /// Starting (and maximum) health.
    #[serde(with = "fixed_decimal")]
    pub health: Fixed,
    /// Staggered while alive at or below this health.
    #[serde(with = "fixed_decimal")]
    pub stagger_threshold: Fixed,
    /// Damage taken per tick while burning.
    #[serde(with = "fixed_decimal")]
    pub burn_damage_per_tick: Fixed,
}

impl Default for EnemySpawn {
    fn default() -> Self {
        Self {
            position: Vec3Fixed::ZERO,
            radius: Fixed::from_num(40),
            health: Fixed::from_num(100),
            stagger_threshold: Fixed::from_num(30),
            burn_damage_per_tick: Fixed::from_num(0.2),
        }
    }
}

/// A hostile entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    /// Entity id.
    pub id: EntityId,
    /// World position.
    pub position: Vec3Fixed,
    /// Collision sphere radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Health pool.
    pub health: ResourcePool<Fixed>,
    /// Stagger threshold.
    #[serde(with = "fixed_serde")]
    pub stagger_threshold: Fixed,
    /// Burning ticks left.
    pub burn_remaining: u32,
    /// Damage per burning tick.
    #[serde(with = "fixed_serde")]
    pub burn_damage_per_tick: Fixed,
}

impl Enemy {
    /// Still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_empty()
    }

    /// Alive and weakened enough to be executed.
    #[must_use]
    pub fn is_staggered(&self) -> bool {
        self.is_alive() && self.health.current() <= self.stagger_threshold
    }

    /// Whether a burn status is active.
    #[must_use]
    pub fn is_burning(&self) -> bool {
        self.is_alive() && self.burn_remaining > 0
    }

    fn snapshot(&self) -> Hostile {
        Hostile {
            id: self.id,
            position: self.position,
            alive: self.is_alive(),
            staggered: self.is_staggered(),
        }
    }
}

/// A physics-simulated sphere that can be pushed by shots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Body id.
    pub id: BodyId,
    /// World position.
    pub position: Vec3Fixed,
    /// Collision sphere radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Mass; impulses change velocity by `impulse / mass`.
    #[serde(with = "fixed_serde")]
    pub mass: Fixed,
    /// Velocity in units per second.
    pub velocity: Vec3Fixed,
    /// Static bodies block rays but never move.
    pub simulating: bool,
}

/// Why an enemy died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    /// Weapon or projectile damage.
    Damage(DamageKind),
    /// Burning status.
    Burned,
    /// Executed while staggered.
    Executed,
    /// Chainsaw kill.
    Chainsaw,
}

/// An enemy death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyDeath {
    /// Entity that died.
    pub id: EntityId,
    /// How it died.
    pub cause: DeathCause,
}

/// Events generated during a tick (and by actions applied since the
/// previous tick).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick that just completed.
    pub tick: Tick,
    /// Events from the player combatant, oldest first.
    pub combat: Vec<CombatEvent>,
    /// Enemies that died.
    pub deaths: Vec<EnemyDeath>,
    /// Projectile spawns requested.
    pub projectiles: Vec<ProjectileRequest>,
}

/// The world the player acts on: enemies, bodies, spawn requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ArenaWorld {
    enemies: Vec<Enemy>,
    bodies: Vec<Body>,
    projectiles: Vec<ProjectileRequest>,
    deaths: Vec<EnemyDeath>,
}

impl ArenaWorld {
    fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id && e.is_alive())
    }

    fn kill(&mut self, id: EntityId, cause: DeathCause) {
        if let Some(enemy) = self.enemy_mut(id) {
            enemy.health.drain();
            enemy.burn_remaining = 0;
            self.deaths.push(EnemyDeath { id, cause });
            tracing::debug!(enemy = id, ?cause, "Enemy killed");
        }
    }

    fn damage(&mut self, id: EntityId, amount: Fixed, cause: DeathCause) {
        let Some(enemy) = self.enemy_mut(id) else {
            return;
        };
        enemy.health.add(-amount);
        if !enemy.is_alive() {
            enemy.burn_remaining = 0;
            self.deaths.push(EnemyDeath { id, cause });
            tracing::debug!(enemy = id, ?cause, "Enemy killed");
        }
    }

    fn burn_tick(&mut self) {
        let burning: Vec<(EntityId, Fixed)> = self
            .enemies
            .iter_mut()
            .filter(|e| e.is_burning())
            .map(|e| {
                e.burn_remaining -= 1;
                (e.id, e.burn_damage_per_tick)
            })
            .collect();
        for (id, amount) in burning {
            self.damage(id, amount, DeathCause::Burned);
        }
    }

    fn integrate_bodies(&mut self) {
        let step = Fixed::ONE / Fixed::from_num(TICK_RATE);
        for body in self.bodies.iter_mut().filter(|b| b.simulating) {
            body.position = body.position + body.velocity.scale(step);
        }
    }
}

/// Ray-sphere intersection along `start..end`. Returns the hit distance
/// from `start`, or zero when `start` is inside the sphere.
fn ray_sphere(
    start: Vec3Fixed,
    direction: Vec3Fixed,
    length: Fixed,
    center: Vec3Fixed,
    radius: Fixed,
) -> Option<Fixed> {
    let along = (center - start).dot(direction);
    let radius_sq = WideFixed::from_num(radius).saturating_mul(WideFixed::from_num(radius));
    let along_wide = WideFixed::from_num(along);
    let miss_sq = center.distance_squared_wide(start) - along_wide.saturating_mul(along_wide);
    if miss_sq > radius_sq {
        return None;
    }
    let half_chord = fixed_sqrt(Fixed::saturating_from_num(radius_sq - miss_sq));
    let entry = along - half_chord;
    let exit = along + half_chord;
    if exit < Fixed::ZERO || entry > length {
        return None;
    }
    Some(entry.max(Fixed::ZERO))
}

impl SpatialQuery for ArenaWorld {
    fn hostiles(&self) -> Vec<Hostile> {
        self.enemies.iter().map(Enemy::snapshot).collect()
    }

    fn ray_cast(&self, start: Vec3Fixed, end: Vec3Fixed) -> Option<RayHit> {
        let segment = end - start;
        let length = segment.length();
        let direction = segment.normalize();
        if direction == Vec3Fixed::ZERO {
            return None;
        }

        let enemy_hits = self
            .enemies
            .iter()
            .filter(|e| e.is_alive())
            .filter_map(|e| {
                ray_sphere(start, direction, length, e.position, e.radius)
                    .map(|t| (t, e.position, Some(e.id), None))
            });
        let body_hits = self.bodies.iter().filter_map(|b| {
            ray_sphere(start, direction, length, b.position, b.radius)
                .map(|t| (t, b.position, None, b.simulating.then_some(b.id)))
        });

        // First minimum wins, so enemies shadow bodies at equal distance
        let mut nearest: Option<(Fixed, Vec3Fixed, Option<EntityId>, Option<BodyId>)> = None;
        for hit in enemy_hits.chain(body_hits) {
            if nearest.map_or(true, |(t, ..)| hit.0 < t) {
                nearest = Some(hit);
            }
        }

        nearest.map(|(t, center, entity, body)| {
            let point = start + direction.scale(t);
            RayHit {
                point,
                normal: (point - center).normalize(),
                entity,
                body,
            }
        })
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3Fixed, _point: Vec3Fixed) {
        if let Some(body) = self
            .bodies
            .iter_mut()
            .find(|b| b.id == body && b.simulating)
        {
            if body.mass > Fixed::ZERO {
                let mass = body.mass;
                body.velocity = body.velocity
                    + Vec3Fixed::new(impulse.x / mass, impulse.y / mass, impulse.z / mass);
            }
        }
    }

    fn spawn_projectile(&mut self, request: ProjectileRequest) {
        tracing::trace!(owner = request.owner, "Projectile requested");
        self.projectiles.push(request);
    }
}

impl DamageSink for ArenaWorld {
    fn apply_damage(&mut self, target: EntityId, amount: Fixed, kind: DamageKind) {
        self.damage(target, amount, DeathCause::Damage(kind));
    }

    fn apply_burning(&mut self, target: EntityId, duration: u32) {
        if let Some(enemy) = self.enemy_mut(target) {
            enemy.burn_remaining = enemy.burn_remaining.max(duration);
        }
    }

    fn resolve_executed(&mut self, target: EntityId) {
        self.kill(target, DeathCause::Executed);
    }

    fn resolve_chainsaw_kill(&mut self, target: EntityId) {
        self.kill(target, DeathCause::Chainsaw);
    }
}

/// Arena simulation: clock, player, enemies, bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    timers: TimerQueue,
    player: Option<Combatant>,
    world: ArenaWorld,
    next_id: EntityId,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// Create an empty arena at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: TimerQueue::new(),
            player: None,
            world: ArenaWorld::default(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Current tick.
    #[must_use]
    pub fn current_tick(&self) -> Tick {
        self.timers.now()
    }

    /// Pending timers, all owners.
    #[must_use]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Spawn the player, replacing (and tearing down) any existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn spawn_player(&mut self, config: CombatantConfig) -> Result<EntityId> {
        let id = self.next_id;
        let combatant = Combatant::new(id, config)?;
        self.allocate_id();
        self.despawn_player();
        self.player = Some(combatant);
        tracing::debug!(player = id, "Player spawned");
        Ok(id)
    }

    /// Tear the player down and remove it. Every timer it owned is
    /// cancelled.
    pub fn despawn_player(&mut self) -> Option<Combatant> {
        let mut player = self.player.take()?;
        player.teardown(&mut self.timers);
        Some(player)
    }

    /// Bring the player back at full strength. Returns `false` without a
    /// player.
    pub fn respawn_player(&mut self) -> bool {
        match &mut self.player {
            Some(player) => {
                player.respawn(&mut self.timers);
                true
            }
            None => false,
        }
    }

    /// The player, if spawned.
    #[must_use]
    pub fn player(&self) -> Option<&Combatant> {
        self.player.as_ref()
    }

    /// Replace the player's pose.
    pub fn set_player_pose(&mut self, pose: Pose) -> bool {
        match &mut self.player {
            Some(player) => {
                player.set_pose(pose);
                true
            }
            None => false,
        }
    }

    /// Spawn an enemy and return its id.
    pub fn spawn_enemy(&mut self, spawn: EnemySpawn) -> EntityId {
        let id = self.allocate_id();
        self.world.enemies.push(Enemy {
            id,
            position: spawn.position,
            radius: spawn.radius,
            health: ResourcePool::full(spawn.health),
            stagger_threshold: spawn.stagger_threshold,
            burn_remaining: 0,
            burn_damage_per_tick: spawn.burn_damage_per_tick,
        });
        id
    }

    /// Spawn a physics body and return its id.
    pub fn spawn_body(
        &mut self,
        position: Vec3Fixed,
        radius: Fixed,
        mass: Fixed,
        simulating: bool,
    ) -> BodyId {
        let id = self.allocate_id();
        self.world.bodies.push(Body {
            id,
            position,
            radius,
            mass,
            velocity: Vec3Fixed::ZERO,
            simulating,
        });
        id
    }

    /// Every enemy, in spawn order.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.world.enemies
    }

    /// Look up an enemy.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] for an unknown id.
    pub fn enemy(&self, id: EntityId) -> Result<&Enemy> {
        self.world
            .enemies
            .iter()
            .find(|e| e.id == id)
            .ok_or(GameError::EntityNotFound(id))
    }

    /// Every body, in spawn order.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.world.bodies
    }

    /// Number of living enemies.
    #[must_use]
    pub fn living_enemies(&self) -> usize {
        self.world.enemies.iter().filter(|e| e.is_alive()).count()
    }

    /// Apply a player action. Returns whether it did anything.
    pub fn apply_action(&mut self, action: Action) -> bool {
        let Some(player) = &mut self.player else {
            return false;
        };
        player.handle_action(action, &mut self.timers, &mut self.world)
    }

    /// Hold the player's trigger and report what happened.
    pub fn start_firing(&mut self) -> Option<FireOutcome> {
        let player = self.player.as_mut()?;
        player.start_firing(&mut self.timers, &mut self.world)
    }

    /// Damage the player. Returns the damage actually taken.
    pub fn damage_player(&mut self, amount: Fixed, kind: DamageKind) -> Fixed {
        self.player
            .as_mut()
            .map_or(Fixed::ZERO, |player| player.take_damage(amount, kind))
    }

    /// Advance one tick.
    ///
    /// 1. Advance the clock and dispatch due timers to their owners
    /// 2. Apply burning damage
    /// 3. Move simulating bodies
    /// 4. Collect events
    pub fn tick(&mut self) -> TickEvents {
        self.timers.advance();

        while let Some(event) = self.timers.pop_due() {
            match &mut self.player {
                Some(player) if player.id() == event.owner => {
                    player.on_timer(event.kind, &mut self.timers, &mut self.world);
                }
                _ => {
                    tracing::trace!(owner = event.owner, kind = ?event.kind, "Dropped timer for unknown owner");
                }
            }
        }

        self.world.burn_tick();
        self.world.integrate_bodies();

        let events = TickEvents {
            tick: self.timers.now(),
            combat: self
                .player
                .as_mut()
                .map(Combatant::drain_events)
                .unwrap_or_default(),
            deaths: std::mem::take(&mut self.world.deaths),
            projectiles: std::mem::take(&mut self.world.projectiles),
        };

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = events.tick, state_hash = hash, "Tick complete");
        }

        events
    }

    /// Assert the cross-module invariants the state machines rely on.
    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        use crate::timer::TimerKind;

        let Some(player) = &self.player else {
            return;
        };
        let dash = player.dash_ability();
        let recharging = player
            .timer_table()
            .get(TimerKind::DashRecharge)
            .is_some_and(|handle| self.timers.is_active(handle));
        assert_eq!(
            recharging,
            dash.charges() < dash.max_charges(),
            "dash recharge timer must run exactly while below capacity"
        );
        for weapon in player.weapons() {
            assert!(weapon.magazine() <= weapon.magazine_capacity());
            assert!(weapon.reserve() <= weapon.max_reserve());
        }
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two arenas with the same history produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.timers.now().hash(&mut hasher);
        self.timers.len().hash(&mut hasher);

        if let Some(player) = &self.player {
            player.hash_state(&mut hasher);
        }

        self.world.enemies.len().hash(&mut hasher);
        for enemy in &self.world.enemies {
            enemy.id.hash(&mut hasher);
            enemy.position.hash(&mut hasher);
            enemy.health.hash(&mut hasher);
            enemy.burn_remaining.hash(&mut hasher);
        }

        for body in &self.world.bodies {
            body.id.hash(&mut hasher);
            body.position.hash(&mut hasher);
            body.velocity.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the arena state to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize arena: {e}")))
    }

    /// Deserialize arena state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize arena: {e}")))
    }
}
