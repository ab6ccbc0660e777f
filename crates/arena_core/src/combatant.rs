//! Character ability orchestrator.
//!
//! A [`Combatant`] owns every piece of per-character combat state (health,
//! armor, chainsaw fuel, the dash, the weapon loadout, ability flags) and
//! turns discrete [`Action`]s into calls on the dash and weapon state
//! machines and the targeting queries.
//!
//! The combatant never holds on to the world or the clock. Each entry point
//! borrows a [`TimerService`] and, when it needs one, a [`World`] for the
//! duration of the call. Timers it schedules come back through
//! [`Combatant::on_timer`]; observable changes accumulate in its
//! [`EventQueue`] until the host calls [`Combatant::drain_events`].
//!
//! Every ability is a no-op while dead. Tearing a combatant down cancels
//! all of its outstanding timers.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::{
    AreaAttackConfig, ChainsawConfig, CombatantConfig, ExecuteConfig, JumpConfig,
};
use crate::dash::DashAbility;
use crate::error::Result;
use crate::events::{CombatEvent, EventQueue};
use crate::math::{fixed_serde, Fixed, SimRng, Vec3Fixed, WideFixed};
use crate::pool::{PoolChange, ResourcePool};
use crate::targeting::{find_all, find_nearest, is_alive, is_executable, Cone};
use crate::timer::{Scheduler, TimerKind, TimerService, TimerTable};
use crate::weapon::{Aim, FireContext, FireOutcome, Weapon};
use crate::world::{DamageKind, EntityId, World};

/// A discrete ability trigger, independent of any input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Dash along the movement input (or forward).
    Dash,
    /// Execute the nearest staggered hostile.
    Execute,
    /// Chainsaw the nearest hostile for ammo.
    RefuelKill,
    /// Set every hostile in the forward cone burning.
    AreaAttack,
    /// Jump, or air-jump while airborne.
    Jump,
    /// Touch down.
    Land,
    /// Switch to a weapon slot.
    SelectWeapon(usize),
    /// Cycle weapons: positive goes to the previous slot, negative to the next.
    ScrollWeapon(i32),
    /// Hold the trigger of the active weapon.
    StartFiring,
    /// Release the trigger of the active weapon.
    StopFiring,
    /// Reload the active weapon from reserve.
    Reload,
    /// Secondary fire. Reserved; does nothing.
    AltFire,
}

/// Where the combatant is and where it is looking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pose {
    /// World position.
    pub position: Vec3Fixed,
    /// Facing (camera forward).
    pub forward: Vec3Fixed,
    /// Last movement input; zero when standing still.
    pub movement_input: Vec3Fixed,
    /// Whether the combatant is standing on the ground.
    pub grounded: bool,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3Fixed::ZERO,
            forward: Vec3Fixed::from_ints(1, 0, 0),
            movement_input: Vec3Fixed::ZERO,
            grounded: true,
        }
    }
}

/// Player-controlled combat character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    id: EntityId,
    pose: Pose,
    health: ResourcePool<Fixed>,
    armor: ResourcePool<Fixed>,
    #[serde(with = "fixed_serde")]
    armor_absorption: Fixed,
    #[serde(with = "fixed_serde")]
    initial_armor: Fixed,
    fuel: ResourcePool<u32>,
    dash: DashAbility,
    weapons: Vec<Weapon>,
    active_weapon: usize,
    invulnerable: bool,
    area_ready: bool,
    jumps_remaining: u32,
    execute: ExecuteConfig,
    chainsaw: ChainsawConfig,
    area_attack: AreaAttackConfig,
    jump: JumpConfig,
    timers: TimerTable,
    rng: SimRng,
    events: EventQueue,
}

impl Combatant {
    /// Build a combatant from a validated config.
    ///
    /// The event queue starts with a full HUD refresh (health, armor, dash,
    /// fuel, cooldown and active weapon ammo).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`](crate::error::GameError::InvalidConfig)
    /// if the config fails validation.
    pub fn new(id: EntityId, config: CombatantConfig) -> Result<Self> {
        config.validate()?;

        let CombatantConfig {
            health,
            armor,
            dash,
            execute,
            chainsaw,
            area_attack,
            jump,
            weapons,
            active_weapon,
            seed,
        } = config;

        let weapons = weapons
            .into_iter()
            .enumerate()
            .map(|(slot, descriptor)| Weapon::new(slot, descriptor))
            .collect();

        let mut combatant = Self {
            id,
            pose: Pose::default(),
            health: ResourcePool::full(health.max),
            armor: ResourcePool::new(armor.initial, armor.max),
            armor_absorption: armor.absorption,
            initial_armor: armor.initial,
            fuel: ResourcePool::full(chainsaw.max_fuel),
            dash: DashAbility::new(&dash),
            weapons,
            active_weapon,
            invulnerable: false,
            area_ready: true,
            jumps_remaining: jump.extra_jumps,
            execute,
            chainsaw,
            area_attack,
            jump,
            timers: TimerTable::new(),
            rng: SimRng::new(seed),
            events: EventQueue::new(),
        };
        combatant.weapons[active_weapon].activate(&mut combatant.events);
        combatant.push_hud_refresh();
        Ok(combatant)
    }

    fn push_hud_refresh(&mut self) {
        let health = self.health.snapshot();
        let armor = self.armor.snapshot();
        let dash = self.dash.snapshot();
        let fuel = self.fuel.snapshot();
        self.events.push(CombatEvent::HealthChanged {
            current: health.current,
            max: health.max,
        });
        self.events.push(CombatEvent::ArmorChanged {
            current: armor.current,
            max: armor.max,
        });
        self.events.push(CombatEvent::DashChargesChanged {
            current: dash.current,
            max: dash.max,
        });
        self.events.push(CombatEvent::FuelChanged {
            current: fuel.current,
            max: fuel.max,
        });
        self.events.push(CombatEvent::AreaCooldownChanged {
            ready_fraction: if self.area_ready {
                Fixed::ONE
            } else {
                Fixed::ZERO
            },
        });
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current pose.
    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Replace the pose (position, facing, movement input, grounded).
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Health pool.
    #[must_use]
    pub fn health(&self) -> &ResourcePool<Fixed> {
        &self.health
    }

    /// Armor pool.
    #[must_use]
    pub fn armor(&self) -> &ResourcePool<Fixed> {
        &self.armor
    }

    /// Chainsaw fuel pool.
    #[must_use]
    pub fn fuel(&self) -> &ResourcePool<u32> {
        &self.fuel
    }

    /// Dash ability.
    #[must_use]
    pub fn dash_ability(&self) -> &DashAbility {
        &self.dash
    }

    /// Owned weapons in slot order.
    #[must_use]
    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    /// Slot of the active weapon.
    #[must_use]
    pub fn active_slot(&self) -> usize {
        self.active_weapon
    }

    /// The active weapon.
    #[must_use]
    pub fn active_weapon(&self) -> Option<&Weapon> {
        self.weapons.get(self.active_weapon)
    }

    /// Whether damage is currently ignored.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    /// Whether the area attack can be used.
    #[must_use]
    pub fn is_area_ready(&self) -> bool {
        self.area_ready
    }

    /// Air jumps left before landing.
    #[must_use]
    pub fn jumps_remaining(&self) -> u32 {
        self.jumps_remaining
    }

    /// Whether health has reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health.is_empty()
    }

    /// Live timer handles.
    #[must_use]
    pub fn timer_table(&self) -> &TimerTable {
        &self.timers
    }

    /// Pending events without consuming them.
    #[must_use]
    pub fn pending_events(&self) -> &[CombatEvent] {
        self.events.pending()
    }

    /// Hand every queued event to the presentation layer.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }

    /// Area attack readiness in `[0, 1]` (1 when ready).
    #[must_use]
    pub fn area_cooldown_fraction(&self, timers: &dyn TimerService) -> Fixed {
        if self.area_ready {
            return Fixed::ONE;
        }
        let remaining = self
            .timers
            .get(TimerKind::AreaCooldown)
            .and_then(|handle| timers.remaining(handle))
            .unwrap_or(0);
        let total = WideFixed::from_num(self.area_attack.cooldown_ticks.max(1));
        let left = WideFixed::from_num(remaining.min(self.area_attack.cooldown_ticks));
        Fixed::ONE - Fixed::saturating_from_num(left / total)
    }

    fn scheduler<'a>(
        id: EntityId,
        table: &'a mut TimerTable,
        timers: &'a mut dyn TimerService,
    ) -> Scheduler<'a> {
        Scheduler::new(id, table, timers)
    }

    fn aim(&self) -> Aim {
        Aim {
            muzzle: self.pose.position,
            target: self.pose.position + self.pose.forward,
        }
    }

    /// Run `f` against weapon `slot` with a fire context borrowed from this
    /// combatant.
    fn with_weapon<R>(
        &mut self,
        slot: usize,
        timers: &mut dyn TimerService,
        world: &mut dyn World,
        f: impl FnOnce(&mut Weapon, &mut FireContext<'_>) -> R,
    ) -> Option<R> {
        let aim = self.aim();
        let Self {
            id,
            weapons,
            timers: table,
            events,
            rng,
            ..
        } = self;
        let weapon = weapons.get_mut(slot)?;
        let mut ctx = FireContext {
            scheduler: Scheduler::new(*id, table, timers),
            world,
            events,
            rng,
            aim,
        };
        Some(f(weapon, &mut ctx))
    }

    // ------------------------------------------------------------------
    // Action routing
    // ------------------------------------------------------------------

    /// Route an [`Action`]. Returns whether it did anything.
    pub fn handle_action(
        &mut self,
        action: Action,
        timers: &mut dyn TimerService,
        world: &mut dyn World,
    ) -> bool {
        match action {
            Action::Dash => self.dash(timers),
            Action::Execute => self.execute(timers, world),
            Action::RefuelKill => self.refuel_kill(world),
            Action::AreaAttack => self.area_attack(timers, world),
            Action::Jump => self.jump(),
            Action::Land => {
                self.land();
                true
            }
            Action::SelectWeapon(slot) => self.select_weapon(slot),
            Action::ScrollWeapon(direction) => self.scroll_weapon(direction),
            Action::StartFiring => !matches!(
                self.start_firing(timers, world),
                None | Some(FireOutcome::Blocked)
            ),
            Action::StopFiring => self.stop_firing(),
            Action::Reload => self.reload(timers),
            Action::AltFire => self.alt_fire(),
        }
    }

    /// Dispatch a timer this combatant scheduled.
    pub fn on_timer(
        &mut self,
        kind: TimerKind,
        timers: &mut dyn TimerService,
        world: &mut dyn World,
    ) {
        match kind {
            TimerKind::DashRecharge => {
                let mut scheduler = Self::scheduler(self.id, &mut self.timers, timers);
                if let Some(change) = self.dash.on_recharge_complete(&mut scheduler) {
                    self.events.push(CombatEvent::DashChargesChanged {
                        current: change.current,
                        max: change.max,
                    });
                }
            }
            TimerKind::Reload { slot } => {
                if let Some(weapon) = self.weapons.get_mut(slot) {
                    weapon.on_reload_complete(&mut self.events);
                }
            }
            TimerKind::Refire { slot } => {
                self.with_weapon(slot, timers, world, Weapon::on_refire_expired);
            }
            TimerKind::Invulnerability => {
                self.invulnerable = false;
                self.events
                    .push(CombatEvent::InvulnerabilityChanged { active: false });
            }
            TimerKind::AreaCooldown => {
                self.area_ready = true;
                self.events.push(CombatEvent::AreaCooldownChanged {
                    ready_fraction: Fixed::ONE,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Damage intake
    // ------------------------------------------------------------------

    /// Take `amount` damage. Armor soaks its share first.
    ///
    /// Returns the damage actually taken (armor plus health); zero while
    /// invulnerable or dead.
    pub fn take_damage(&mut self, amount: Fixed, kind: DamageKind) -> Fixed {
        if self.invulnerable || self.is_dead() || amount <= Fixed::ZERO {
            return Fixed::ZERO;
        }

        let mut armor_damage = Fixed::ZERO;
        if self.armor.current() > Fixed::ZERO {
            armor_damage = (amount * self.armor_absorption).min(self.armor.current());
            if let Some(change) = self.armor.add(-armor_damage) {
                self.push_armor(change);
            }
        }

        let before = self.health.current();
        if let Some(change) = self.health.add(-(amount - armor_damage)) {
            self.push_health(change);
        }
        let health_damage = before - self.health.current();

        tracing::trace!(
            id = self.id,
            ?kind,
            amount = %amount,
            armor_damage = %armor_damage,
            health = %self.health.current(),
            "Damage taken"
        );

        if self.health.is_empty() {
            if let Some(weapon) = self.weapons.get_mut(self.active_weapon) {
                weapon.stop_firing();
            }
            self.events.push(CombatEvent::Died);
            tracing::debug!(id = self.id, "Combatant died");
        }

        armor_damage + health_damage
    }

    fn push_health(&mut self, change: PoolChange<Fixed>) {
        self.events.push(CombatEvent::HealthChanged {
            current: change.current,
            max: change.max,
        });
    }

    fn push_armor(&mut self, change: PoolChange<Fixed>) {
        self.events.push(CombatEvent::ArmorChanged {
            current: change.current,
            max: change.max,
        });
    }

    // ------------------------------------------------------------------
    // Abilities
    // ------------------------------------------------------------------

    /// Dash along the movement input, or forward without one.
    pub fn dash(&mut self, timers: &mut dyn TimerService) -> bool {
        if self.is_dead() {
            return false;
        }
        let direction = if self.pose.movement_input.is_nearly_zero() {
            self.pose.forward
        } else {
            self.pose.movement_input
        };

        let mut scheduler = Self::scheduler(self.id, &mut self.timers, timers);
        let launched = self.dash.try_dash(direction, &mut scheduler);
        if let Some(velocity) = launched {
            self.events.push(CombatEvent::Launched {
                velocity,
                override_xy: true,
                override_z: true,
            });
            tracing::debug!(id = self.id, charges = self.dash.charges(), "Dash");
        }
        let charges = self.dash.snapshot();
        self.events.push(CombatEvent::DashChargesChanged {
            current: charges.current,
            max: charges.max,
        });
        launched.is_some()
    }

    /// Execute the nearest staggered hostile within reach.
    ///
    /// Grants brief invulnerability and restores health.
    pub fn execute(&mut self, timers: &mut dyn TimerService, world: &mut dyn World) -> bool {
        if self.is_dead() {
            return false;
        }
        let Some(target) = find_nearest(
            self.pose.position,
            self.execute.range,
            &world.hostiles(),
            is_executable,
            None,
        ) else {
            return false;
        };

        self.invulnerable = true;
        Self::scheduler(self.id, &mut self.timers, timers)
            .start(TimerKind::Invulnerability, self.execute.invuln_ticks);
        self.events
            .push(CombatEvent::InvulnerabilityChanged { active: true });

        world.resolve_executed(target.id);
        self.events.push(CombatEvent::Executed { target: target.id });
        tracing::debug!(id = self.id, target = target.id, "Execute");

        self.add_health(self.execute.health_restore);
        true
    }

    /// Chainsaw the nearest living hostile within reach for ammo.
    ///
    /// Consumes one fuel only when a target is found.
    pub fn refuel_kill(&mut self, world: &mut dyn World) -> bool {
        if self.is_dead() || self.fuel.is_empty() {
            return false;
        }
        let Some(target) = find_nearest(
            self.pose.position,
            self.chainsaw.range,
            &world.hostiles(),
            is_alive,
            None,
        ) else {
            return false;
        };

        if let Some(change) = self.fuel.add(-1) {
            self.events.push(CombatEvent::FuelChanged {
                current: change.current,
                max: change.max,
            });
        }

        world.resolve_chainsaw_kill(target.id);
        self.events.push(CombatEvent::ChainsawKill { target: target.id });
        tracing::debug!(
            id = self.id,
            target = target.id,
            fuel = self.fuel.current(),
            "Chainsaw kill"
        );

        self.add_ammo_to_all_weapons(self.chainsaw.ammo_restore);
        true
    }

    /// Set every living hostile in the forward cone burning, then go on
    /// cooldown.
    pub fn area_attack(&mut self, timers: &mut dyn TimerService, world: &mut dyn World) -> bool {
        if self.is_dead() || !self.area_ready {
            return false;
        }

        self.area_ready = false;
        Self::scheduler(self.id, &mut self.timers, timers)
            .start(TimerKind::AreaCooldown, self.area_attack.cooldown_ticks);
        self.events.push(CombatEvent::AreaCooldownChanged {
            ready_fraction: Fixed::ZERO,
        });

        let targets = find_all(
            self.pose.position,
            self.area_attack.range,
            &world.hostiles(),
            is_alive,
            Some(Cone::new(self.pose.forward, self.area_attack.half_angle)),
        );
        for target in &targets {
            world.apply_burning(target.id, self.area_attack.burn_ticks);
        }

        let count = u32::try_from(targets.len()).unwrap_or(u32::MAX);
        self.events.push(CombatEvent::AreaAttack { targets: count });
        tracing::debug!(id = self.id, targets = count, "Area attack");
        true
    }

    /// Jump from the ground, or spend an air jump.
    pub fn jump(&mut self) -> bool {
        if self.is_dead() {
            return false;
        }
        if self.pose.grounded {
            self.pose.grounded = false;
            self.jumps_remaining = self.jump.extra_jumps;
            self.events.push(CombatEvent::Jumped);
            return true;
        }
        if self.jumps_remaining == 0 {
            return false;
        }
        self.jumps_remaining -= 1;
        self.events.push(CombatEvent::Launched {
            velocity: Vec3Fixed::new(Fixed::ZERO, Fixed::ZERO, self.jump.jump_velocity),
            override_xy: false,
            override_z: true,
        });
        true
    }

    /// Touch down: grounded again, air jumps restored.
    pub fn land(&mut self) {
        self.pose.grounded = true;
        self.jumps_remaining = self.jump.extra_jumps;
    }

    /// Secondary fire. Reserved hook; always a no-op.
    pub fn alt_fire(&mut self) -> bool {
        false
    }

    // ------------------------------------------------------------------
    // Weapons
    // ------------------------------------------------------------------

    /// Hold the active weapon's trigger.
    pub fn start_firing(
        &mut self,
        timers: &mut dyn TimerService,
        world: &mut dyn World,
    ) -> Option<FireOutcome> {
        if self.is_dead() {
            return None;
        }
        self.with_weapon(self.active_weapon, timers, world, Weapon::start_firing)
    }

    /// Release the active weapon's trigger.
    pub fn stop_firing(&mut self) -> bool {
        match self.weapons.get_mut(self.active_weapon) {
            Some(weapon) if weapon.is_firing() => {
                weapon.stop_firing();
                true
            }
            _ => false,
        }
    }

    /// Reload the active weapon.
    pub fn reload(&mut self, timers: &mut dyn TimerService) -> bool {
        if self.is_dead() {
            return false;
        }
        let Some(weapon) = self.weapons.get_mut(self.active_weapon) else {
            return false;
        };
        let mut scheduler = Scheduler::new(self.id, &mut self.timers, timers);
        weapon.reload(&mut scheduler, &mut self.events)
    }

    /// Switch to weapon `slot`.
    pub fn select_weapon(&mut self, slot: usize) -> bool {
        if self.is_dead() || slot >= self.weapons.len() || slot == self.active_weapon {
            return false;
        }
        let from = self.active_weapon;
        self.weapons[from].deactivate();
        self.active_weapon = slot;
        self.weapons[slot].activate(&mut self.events);
        self.events.push(CombatEvent::WeaponSwitched { from, to: slot });
        tracing::debug!(id = self.id, from, to = slot, "Weapon switched");
        true
    }

    /// Cycle weapons with wrap-around. Positive `direction` selects the
    /// previous slot, negative the next.
    pub fn scroll_weapon(&mut self, direction: i32) -> bool {
        let count = self.weapons.len();
        if self.is_dead() || count <= 1 || direction == 0 {
            return false;
        }
        let slot = if direction > 0 {
            (self.active_weapon + count - 1) % count
        } else {
            (self.active_weapon + 1) % count
        };
        self.select_weapon(slot)
    }

    // ------------------------------------------------------------------
    // Resource modifiers
    // ------------------------------------------------------------------

    /// Restore health, clamped to the maximum. Does not revive.
    pub fn add_health(&mut self, amount: Fixed) -> bool {
        if self.is_dead() {
            return false;
        }
        match self.health.add(amount) {
            Some(change) => {
                self.push_health(change);
                true
            }
            None => false,
        }
    }

    /// Add armor, clamped to the maximum.
    pub fn add_armor(&mut self, amount: Fixed) -> bool {
        match self.armor.add(amount) {
            Some(change) => {
                self.push_armor(change);
                true
            }
            None => false,
        }
    }

    /// Add chainsaw fuel, clamped to the maximum.
    pub fn add_chainsaw_fuel(&mut self, amount: u32) -> bool {
        match self.fuel.add(i64::from(amount)) {
            Some(change) => {
                self.events.push(CombatEvent::FuelChanged {
                    current: change.current,
                    max: change.max,
                });
                true
            }
            None => false,
        }
    }

    /// Add reserve ammo to every owned weapon and refresh the active
    /// weapon's HUD.
    pub fn add_ammo_to_all_weapons(&mut self, amount: u32) {
        for weapon in &mut self.weapons {
            weapon.add_reserve_ammo(amount);
        }
        if let Some(weapon) = self.weapons.get(self.active_weapon) {
            self.events.push(weapon.ammo_event());
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Bring the combatant back at full strength, clearing every timer and
    /// transient flag.
    pub fn respawn(&mut self, timers: &mut dyn TimerService) {
        let mut scheduler = Self::scheduler(self.id, &mut self.timers, timers);
        self.dash.reset(&mut scheduler);
        for weapon in &mut self.weapons {
            weapon.cancel_timers(&mut scheduler);
        }
        scheduler.cancel_all();

        self.health.fill();
        self.armor.set(self.initial_armor);
        self.fuel.fill();
        self.invulnerable = false;
        self.area_ready = true;
        self.pose.grounded = true;
        self.jumps_remaining = self.jump.extra_jumps;

        if let Some(weapon) = self.weapons.get(self.active_weapon) {
            self.events.push(weapon.ammo_event());
        }
        self.push_hud_refresh();
        tracing::debug!(id = self.id, "Combatant respawned");
    }

    /// Cancel every outstanding timer. Call before dropping the combatant.
    ///
    /// Returns how many timers were still pending.
    pub fn teardown(&mut self, timers: &mut dyn TimerService) -> usize {
        for weapon in &mut self.weapons {
            weapon.stop_firing();
        }
        let cancelled = self.timers.cancel_all(timers);
        tracing::debug!(id = self.id, cancelled, "Combatant torn down");
        cancelled
    }

    /// Feed the gameplay-relevant state into `state`.
    pub fn hash_state<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.pose.hash(state);
        self.health.hash(state);
        self.armor.hash(state);
        self.fuel.hash(state);
        self.dash.charges().hash(state);
        self.active_weapon.hash(state);
        for weapon in &self.weapons {
            weapon.magazine().hash(state);
            weapon.reserve().hash(state);
            weapon.state().hash(state);
        }
        self.invulnerable.hash(state);
        self.area_ready.hash(state);
        self.jumps_remaining.hash(state);
        self.rng.hash(state);
    }
}
