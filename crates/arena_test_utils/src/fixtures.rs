//! Test fixtures and helpers.
//!
//! Pre-built loadouts, arenas and a recording world for consistent testing.

use std::cell::RefCell;

use arena_core::arena::{Arena, EnemySpawn};
use arena_core::combatant::{Action, Combatant};
use arena_core::config::{CombatantConfig, WeaponDescriptor};
use arena_core::math::{Fixed, Vec3Fixed};
use arena_core::timer::{Tick, TimerQueue, TimerService};
use arena_core::world::{
    BodyId, DamageKind, DamageSink, EntityId, Hostile, ProjectileRequest, RayHit, SpatialQuery,
};
use serde::{Deserialize, Serialize};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// Create a vector from integer components.
#[must_use]
pub fn vec3(x: i32, y: i32, z: i32) -> Vec3Fixed {
    Vec3Fixed::from_ints(x, y, z)
}

// ============================================================================
// Loadouts
// ============================================================================

/// Default tuning with only the given weapons.
#[must_use]
pub fn loadout(weapons: Vec<WeaponDescriptor>) -> CombatantConfig {
    CombatantConfig {
        weapons,
        active_weapon: 0,
        ..CombatantConfig::default()
    }
}

/// Default tuning carrying just the super shotgun.
#[must_use]
pub fn shotgun_only() -> CombatantConfig {
    loadout(vec![WeaponDescriptor::super_shotgun()])
}

/// Default tuning carrying just the heavy rifle.
#[must_use]
pub fn rifle_only() -> CombatantConfig {
    loadout(vec![WeaponDescriptor::heavy_rifle()])
}

/// Parse a loadout from RON, panicking with the parse error on failure.
///
/// # Panics
///
/// Panics if `source` is not a valid [`CombatantConfig`].
#[must_use]
pub fn config_from_ron(source: &str) -> CombatantConfig {
    match CombatantConfig::from_ron_str(source) {
        Ok(config) => config,
        Err(e) => panic!("fixture config does not parse: {e}"),
    }
}

/// Spawn a combatant with id 1 and discard its spawn HUD refresh.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn spawn_combatant(config: CombatantConfig) -> Combatant {
    let mut combatant = match Combatant::new(1, config) {
        Ok(combatant) => combatant,
        Err(e) => panic!("fixture config rejected: {e}"),
    };
    combatant.drain_events();
    combatant
}

// ============================================================================
// Arenas
// ============================================================================

/// Spawn parameters for an enemy at `(x, y, 0)`.
#[must_use]
pub fn enemy_at(x: i32, y: i32) -> EnemySpawn {
    EnemySpawn {
        position: vec3(x, y, 0),
        ..EnemySpawn::default()
    }
}

/// Arena with a default player at the origin facing +X.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn arena_with_player(config: CombatantConfig) -> Arena {
    let mut arena = Arena::new();
    if let Err(e) = arena.spawn_player(config) {
        panic!("fixture config rejected: {e}");
    }
    arena
}

/// Place `count` enemies on a line along +X, `spacing` apart, starting one
/// spacing from the origin.
pub fn line_of_enemies(arena: &mut Arena, count: i32, spacing: i32) -> Vec<EntityId> {
    (1..=count)
        .map(|i| arena.spawn_enemy(enemy_at(i * spacing, 0)))
        .collect()
}

/// Place enemies on the eight compass points around the origin.
pub fn ring_of_enemies(arena: &mut Arena, radius: i32) -> Vec<EntityId> {
    let diagonal = radius * 7 / 10;
    [
        (radius, 0),
        (diagonal, diagonal),
        (0, radius),
        (-diagonal, diagonal),
        (-radius, 0),
        (-diagonal, -diagonal),
        (0, -radius),
        (diagonal, -diagonal),
    ]
    .into_iter()
    .map(|(x, y)| arena.spawn_enemy(enemy_at(x, y)))
    .collect()
}

/// One scripted player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Tick on which the action is applied (before that tick is simulated).
    pub tick: Tick,
    /// Action to apply.
    pub action: Action,
}

/// Parse a script from RON.
///
/// # Panics
///
/// Panics if `source` is not a valid list of steps.
#[must_use]
pub fn script_from_ron(source: &str) -> Vec<ScriptStep> {
    match ron::from_str(source) {
        Ok(steps) => steps,
        Err(e) => panic!("fixture script does not parse: {e}"),
    }
}

/// An arena plus a tick-stamped action script.
#[derive(Debug, Clone)]
pub struct ScriptedArena {
    /// The arena being driven.
    pub arena: Arena,
    /// Steps to apply, in order.
    pub script: Vec<ScriptStep>,
}

impl ScriptedArena {
    /// Bundle an arena and a script.
    #[must_use]
    pub fn new(arena: Arena, mut script: Vec<ScriptStep>) -> Self {
        script.sort_by_key(|step| step.tick);
        Self { arena, script }
    }

    /// Apply every action scheduled for the current tick, then tick.
    pub fn step(&mut self) {
        let now = self.arena.current_tick();
        for step in self.script.iter().filter(|s| s.tick == now) {
            self.arena.apply_action(step.action);
        }
        self.arena.tick();
    }

    /// State hash of the arena.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.arena.state_hash()
    }
}

/// A busy loadout test: fire, dash, burn, execute, chainsaw, swap weapons.
#[must_use]
pub fn brawl_script() -> Vec<ScriptStep> {
    use Action::{
        AreaAttack, Dash, Execute, Jump, Land, RefuelKill, ScrollWeapon, StartFiring, StopFiring,
    };
    [
        (0, StartFiring),
        (1, StopFiring),
        (5, AreaAttack),
        (10, Dash),
        (12, Jump),
        (14, Jump),
        (30, Land),
        (50, StartFiring),
        (51, StopFiring),
        (60, ScrollWeapon(-1)),
        (61, StartFiring),
        (90, StopFiring),
        (120, Execute),
        (125, RefuelKill),
        (130, Dash),
        (131, Dash),
        (200, ScrollWeapon(1)),
        (201, StartFiring),
    ]
    .into_iter()
    .map(|(tick, action)| ScriptStep { tick, action })
    .collect()
}

/// Arena with the default loadout, a line of enemies ahead and a ring
/// around the player, driven by [`brawl_script`].
#[must_use]
pub fn brawl() -> ScriptedArena {
    let mut arena = arena_with_player(CombatantConfig::default());
    line_of_enemies(&mut arena, 4, 150);
    ring_of_enemies(&mut arena, 900);
    arena.spawn_body(vec3(250, 60, 0), fixed(30), fixed(20), true);
    ScriptedArena::new(arena, brawl_script())
}

// ============================================================================
// Recording world
// ============================================================================

/// A [`World`](arena_core::world::World) that serves a fixed list of
/// hostiles, answers ray casts from a queue of canned hits, and records
/// every call made against it.
#[derive(Debug, Default)]
pub struct RecordingWorld {
    /// Hostiles returned by `hostiles()`.
    pub hostiles: Vec<Hostile>,
    /// Canned ray cast results, consumed front to back; `None` once empty.
    pub ray_hits: RefCell<Vec<RayHit>>,
    /// Result used for every ray once `ray_hits` runs out.
    pub default_hit: Option<RayHit>,
    /// Every ray cast, as `(start, end)`.
    pub rays: RefCell<Vec<(Vec3Fixed, Vec3Fixed)>>,
    /// Every damage application.
    pub damage: Vec<(EntityId, Fixed, DamageKind)>,
    /// Every impulse.
    pub impulses: Vec<(BodyId, Vec3Fixed, Vec3Fixed)>,
    /// Every projectile request.
    pub projectiles: Vec<ProjectileRequest>,
    /// Every burning application.
    pub burning: Vec<(EntityId, u32)>,
    /// Executed targets.
    pub executed: Vec<EntityId>,
    /// Chainsaw-killed targets.
    pub chainsawed: Vec<EntityId>,
}

impl RecordingWorld {
    /// World with the given hostiles and no ray hits.
    #[must_use]
    pub fn with_hostiles(hostiles: Vec<Hostile>) -> Self {
        Self {
            hostiles,
            ..Self::default()
        }
    }

    /// Number of rays cast so far.
    #[must_use]
    pub fn ray_count(&self) -> usize {
        self.rays.borrow().len()
    }

    fn mark_dead(&mut self, target: EntityId) {
        if let Some(hostile) = self.hostiles.iter_mut().find(|h| h.id == target) {
            hostile.alive = false;
            hostile.staggered = false;
        }
    }
}

/// A hostile snapshot for recording worlds.
#[must_use]
pub fn hostile(id: EntityId, position: Vec3Fixed, staggered: bool) -> Hostile {
    Hostile {
        id,
        position,
        alive: true,
        staggered,
    }
}

impl SpatialQuery for RecordingWorld {
    fn hostiles(&self) -> Vec<Hostile> {
        self.hostiles.clone()
    }

    fn ray_cast(&self, start: Vec3Fixed, end: Vec3Fixed) -> Option<RayHit> {
        self.rays.borrow_mut().push((start, end));
        let mut queued = self.ray_hits.borrow_mut();
        if queued.is_empty() {
            self.default_hit
        } else {
            Some(queued.remove(0))
        }
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3Fixed, point: Vec3Fixed) {
        self.impulses.push((body, impulse, point));
    }

    fn spawn_projectile(&mut self, request: ProjectileRequest) {
        self.projectiles.push(request);
    }
}

impl DamageSink for RecordingWorld {
    fn apply_damage(&mut self, target: EntityId, amount: Fixed, kind: DamageKind) {
        tracing::trace!(target, %amount, ?kind, "Recorded damage");
        self.damage.push((target, amount, kind));
    }

    fn apply_burning(&mut self, target: EntityId, duration: u32) {
        self.burning.push((target, duration));
    }

    fn resolve_executed(&mut self, target: EntityId) {
        self.executed.push(target);
        self.mark_dead(target);
    }

    fn resolve_chainsaw_kill(&mut self, target: EntityId) {
        self.chainsawed.push(target);
        self.mark_dead(target);
    }
}

/// Advance `queue` by `ticks`, dispatching every due timer into
/// `combatant` (timers for other owners are dropped).
pub fn run_ticks(
    combatant: &mut Combatant,
    queue: &mut TimerQueue,
    world: &mut RecordingWorld,
    ticks: u32,
) {
    for _ in 0..ticks {
        queue.advance();
        while let Some(event) = queue.pop_due() {
            if event.owner == combatant.id() {
                combatant.on_timer(event.kind, queue, world);
            }
        }
    }
}

/// Ticks until the timer service reaches `tick`.
#[must_use]
pub fn ticks_until(queue: &TimerQueue, tick: Tick) -> u32 {
    u32::try_from(tick.saturating_sub(queue.now())).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_from_ron() {
        let script = script_from_ron("[(tick: 3, action: Dash), (tick: 4, action: SelectWeapon(2))]");
        assert_eq!(
            script,
            vec![
                ScriptStep {
                    tick: 3,
                    action: Action::Dash
                },
                ScriptStep {
                    tick: 4,
                    action: Action::SelectWeapon(2)
                },
            ]
        );
    }

    #[test]
    fn test_recording_world_consumes_canned_hits() {
        let hit = RayHit {
            point: vec3(1, 0, 0),
            normal: vec3(-1, 0, 0),
            entity: Some(5),
            body: None,
        };
        let world = RecordingWorld {
            ray_hits: RefCell::new(vec![hit]),
            ..RecordingWorld::default()
        };

        assert_eq!(world.ray_cast(Vec3Fixed::ZERO, vec3(10, 0, 0)), Some(hit));
        assert_eq!(world.ray_cast(Vec3Fixed::ZERO, vec3(10, 0, 0)), None);
        assert_eq!(world.ray_count(), 2);
    }

    #[test]
    fn test_brawl_fixture_spawns_everything() {
        let brawl = brawl();
        assert_eq!(brawl.arena.enemies().len(), 12);
        assert_eq!(brawl.arena.bodies().len(), 1);
        assert!(brawl.arena.player().is_some());
    }

    #[test]
    fn test_config_from_ron() {
        let config = config_from_ron("(dash: (max_charges: 4))");
        assert_eq!(config.dash.max_charges, 4);
    }
}
