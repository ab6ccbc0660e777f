//! Weapon fire/reload state machine.
//!
//! A weapon cycles between four observable states:
//!
//! - `Idle` - ready to fire
//! - `FiringCooldown` - waiting out `refire_ticks` after a shot
//! - `Reloading` - moving rounds from reserve into the magazine
//! - `Dry` - magazine empty and not reloading
//!
//! Firing is driven by the trigger: [`Weapon::start_firing`] shoots at once
//! unless a refire cooldown is still running, and an automatic weapon keeps
//! shooting from its refire timer for as long as the trigger stays held.
//! Every refusal is a silent no-op reported through [`FireOutcome`].

use serde::{Deserialize, Serialize};

use crate::config::{FireMode, HitscanParams, ProjectileParams, WeaponDescriptor};
use crate::events::{CombatEvent, EventQueue};
use crate::math::{random_direction_in_cone, SimRng, Vec3Fixed};
use crate::pool::ResourcePool;
use crate::timer::{Scheduler, Tick, TimerKind};
use crate::world::{ProjectileRequest, World};

/// Observable weapon state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponState {
    /// Ready to fire.
    Idle,
    /// Waiting for the refire timer.
    FiringCooldown,
    /// Reload in flight.
    Reloading,
    /// Magazine empty, no reload in flight.
    Dry,
}

/// What a call to [`Weapon::fire`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Trigger released, reloading, or cooling down. Nothing changed.
    Blocked,
    /// Magazine was empty; a reload from reserve started instead.
    ReloadStarted,
    /// Magazine and reserve empty (or auto-reload off); dry click.
    DryFire,
    /// Hitscan volley resolved.
    Fired {
        /// Rays cast.
        rays: u32,
        /// Rays that struck something.
        hits: u32,
    },
    /// Projectile spawn requested.
    Launched,
}

/// Muzzle position and aim point for one shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aim {
    /// Muzzle position.
    pub muzzle: Vec3Fixed,
    /// Point the shooter is aiming at.
    pub target: Vec3Fixed,
}

impl Aim {
    /// Unit direction from muzzle to target.
    #[must_use]
    pub fn direction(&self) -> Vec3Fixed {
        (self.target - self.muzzle).normalize()
    }
}

/// Everything a shot touches outside the weapon itself.
pub struct FireContext<'a> {
    /// Owner's timers.
    pub scheduler: Scheduler<'a>,
    /// Live world.
    pub world: &'a mut dyn World,
    /// Owner's outbound events.
    pub events: &'a mut EventQueue,
    /// Owner's spread RNG.
    pub rng: &'a mut SimRng,
    /// Where the shot goes.
    pub aim: Aim,
}

/// One owned weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    slot: usize,
    descriptor: WeaponDescriptor,
    magazine: ResourcePool<u32>,
    reserve: ResourcePool<u32>,
    reloading: bool,
    trigger_held: bool,
    cooling_down: bool,
    last_fire_tick: Option<Tick>,
    active: bool,
}

impl Weapon {
    /// Create a weapon in `slot` with a full magazine.
    #[must_use]
    pub fn new(slot: usize, descriptor: WeaponDescriptor) -> Self {
        Self {
            slot,
            magazine: ResourcePool::full(descriptor.magazine_size),
            reserve: ResourcePool::new(descriptor.initial_reserve, descriptor.max_reserve),
            descriptor,
            reloading: false,
            trigger_held: false,
            cooling_down: false,
            last_fire_tick: None,
            active: false,
        }
    }

    /// Slot index in the owner's loadout.
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Static description.
    #[must_use]
    pub fn descriptor(&self) -> &WeaponDescriptor {
        &self.descriptor
    }

    /// Rounds in the magazine.
    #[must_use]
    pub fn magazine(&self) -> u32 {
        self.magazine.current()
    }

    /// Magazine capacity.
    #[must_use]
    pub fn magazine_capacity(&self) -> u32 {
        self.magazine.max()
    }

    /// Rounds in reserve.
    #[must_use]
    pub fn reserve(&self) -> u32 {
        self.reserve.current()
    }

    /// Reserve ceiling.
    #[must_use]
    pub fn max_reserve(&self) -> u32 {
        self.reserve.max()
    }

    /// Whether a reload is in flight.
    #[must_use]
    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Whether the trigger is held.
    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.trigger_held
    }

    /// Whether this is the owner's active weapon.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Tick of the most recent shot.
    #[must_use]
    pub fn last_fire_tick(&self) -> Option<Tick> {
        self.last_fire_tick
    }

    /// Whether there is anything left to shoot, loaded or in reserve.
    #[must_use]
    pub fn has_ammo(&self) -> bool {
        !self.magazine.is_empty() || !self.reserve.is_empty()
    }

    /// Current observable state.
    #[must_use]
    pub fn state(&self) -> WeaponState {
        if self.reloading {
            WeaponState::Reloading
        } else if self.magazine.is_empty() {
            WeaponState::Dry
        } else if self.cooling_down {
            WeaponState::FiringCooldown
        } else {
            WeaponState::Idle
        }
    }

    /// HUD refresh for this weapon.
    #[must_use]
    pub fn ammo_event(&self) -> CombatEvent {
        CombatEvent::AmmoChanged {
            slot: self.slot,
            magazine: self.magazine.current(),
            capacity: self.magazine.max(),
            reserve: self.reserve.current(),
        }
    }

    /// Hold the trigger. Fires at once unless the refire cooldown is running.
    pub fn start_firing(&mut self, ctx: &mut FireContext<'_>) -> FireOutcome {
        self.trigger_held = true;
        if self.cooling_down {
            return FireOutcome::Blocked;
        }
        self.fire(ctx)
    }

    /// Release the trigger. A pending refire timer keeps running.
    pub fn stop_firing(&mut self) {
        self.trigger_held = false;
    }

    /// Attempt one shot.
    pub fn fire(&mut self, ctx: &mut FireContext<'_>) -> FireOutcome {
        if !self.trigger_held || self.reloading || self.cooling_down {
            return FireOutcome::Blocked;
        }

        if self.magazine.is_empty() {
            if !self.reserve.is_empty() && self.descriptor.auto_reload {
                self.begin_reload(&mut ctx.scheduler, ctx.events);
                return FireOutcome::ReloadStarted;
            }
            ctx.events.push(CombatEvent::DryFire { slot: self.slot });
            return FireOutcome::DryFire;
        }

        let outcome = match &self.descriptor.fire_mode {
            FireMode::Hitscan(params) => {
                let direction = ctx.aim.direction();
                let hit = Self::trace(params, direction, ctx);
                FireOutcome::Fired {
                    rays: 1,
                    hits: u32::from(hit),
                }
            }
            FireMode::MultiPellet {
                hitscan,
                pellet_count,
                spread_half_angle,
            } => {
                let aim_direction = ctx.aim.direction();
                let mut hits = 0;
                for _ in 0..*pellet_count {
                    let direction =
                        random_direction_in_cone(aim_direction, *spread_half_angle, ctx.rng);
                    if Self::trace(hitscan, direction, ctx) {
                        hits += 1;
                    }
                }
                FireOutcome::Fired {
                    rays: *pellet_count,
                    hits,
                }
            }
            FireMode::Projectile(params) => {
                Self::launch(params, ctx);
                FireOutcome::Launched
            }
        };

        ctx.events.push(CombatEvent::FiringEffect { slot: self.slot });
        ctx.events.push(CombatEvent::Recoil {
            amount: self.descriptor.recoil,
        });

        self.magazine.add(-1);
        ctx.events.push(self.ammo_event());
        self.last_fire_tick = Some(ctx.scheduler.now());

        tracing::trace!(
            slot = self.slot,
            weapon = %self.descriptor.name,
            magazine = self.magazine.current(),
            reserve = self.reserve.current(),
            "Weapon fired"
        );

        if self.magazine.is_empty()
            && !self.reserve.is_empty()
            && self.descriptor.auto_reload
            && !self.descriptor.automatic
        {
            self.begin_reload(&mut ctx.scheduler, ctx.events);
        }

        self.cooling_down = true;
        ctx.scheduler
            .start(TimerKind::Refire { slot: self.slot }, self.descriptor.refire_ticks);

        outcome
    }

    /// Cast one hitscan ray and apply its effects. Returns whether anything
    /// was struck.
    fn trace(params: &HitscanParams, direction: Vec3Fixed, ctx: &mut FireContext<'_>) -> bool {
        let start = ctx.aim.muzzle + direction.scale(params.muzzle_offset);
        let end = start + direction.scale(params.range);
        let Some(hit) = ctx.world.ray_cast(start, end) else {
            return false;
        };

        if let Some(entity) = hit.entity {
            if entity != ctx.scheduler.owner() {
                ctx.world
                    .apply_damage(entity, params.damage, params.damage_kind);
            }
        }
        if let Some(body) = hit.body {
            ctx.world
                .apply_impulse(body, direction.scale(params.impulse), hit.point);
        }
        true
    }

    fn launch(params: &ProjectileParams, ctx: &mut FireContext<'_>) {
        ctx.world.spawn_projectile(ProjectileRequest {
            owner: ctx.scheduler.owner(),
            origin: ctx.aim.muzzle,
            direction: ctx.aim.direction(),
            speed: params.speed,
            damage: params.damage,
            kind: params.damage_kind,
        });
    }

    /// Refire timer expired. Automatic weapons shoot again if the trigger
    /// is still held; semi-automatic weapons only become ready.
    pub fn on_refire_expired(&mut self, ctx: &mut FireContext<'_>) -> FireOutcome {
        self.cooling_down = false;
        if self.descriptor.automatic {
            self.fire(ctx)
        } else {
            FireOutcome::Blocked
        }
    }

    /// Manual reload. Refused while reloading, with a full magazine, or an
    /// empty reserve.
    pub fn reload(&mut self, scheduler: &mut Scheduler<'_>, events: &mut EventQueue) -> bool {
        if self.magazine.is_full() {
            return false;
        }
        self.begin_reload(scheduler, events)
    }

    /// Start moving rounds from reserve. Releases the trigger.
    fn begin_reload(&mut self, scheduler: &mut Scheduler<'_>, events: &mut EventQueue) -> bool {
        if self.reloading || self.reserve.is_empty() {
            return false;
        }
        self.reloading = true;
        self.stop_firing();
        scheduler.start(TimerKind::Reload { slot: self.slot }, self.descriptor.reload_ticks);
        events.push(CombatEvent::ReloadStarted { slot: self.slot });
        tracing::debug!(
            slot = self.slot,
            weapon = %self.descriptor.name,
            reserve = self.reserve.current(),
            "Reload started"
        );
        true
    }

    /// Reload timer expired: transfer `min(missing, reserve)` rounds.
    pub fn on_reload_complete(&mut self, events: &mut EventQueue) -> u32 {
        self.reloading = false;
        let loaded = self.reserve.take(self.magazine.missing());
        self.magazine.add(i64::from(loaded));
        events.push(self.ammo_event());
        tracing::debug!(
            slot = self.slot,
            weapon = %self.descriptor.name,
            loaded,
            magazine = self.magazine.current(),
            reserve = self.reserve.current(),
            "Reload complete"
        );
        loaded
    }

    /// Add rounds to the reserve, clamped to its ceiling. Never reloads.
    pub fn add_reserve_ammo(&mut self, amount: u32) -> bool {
        self.reserve.add(i64::from(amount)).is_some()
    }

    /// Make this the owner's active weapon and refresh the HUD.
    pub fn activate(&mut self, events: &mut EventQueue) {
        self.active = true;
        events.push(self.ammo_event());
    }

    /// Holster the weapon.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.stop_firing();
    }

    /// Cancel this weapon's timers and clear transient flags.
    pub fn cancel_timers(&mut self, scheduler: &mut Scheduler<'_>) {
        scheduler.cancel(TimerKind::Refire { slot: self.slot });
        scheduler.cancel(TimerKind::Reload { slot: self.slot });
        self.reloading = false;
        self.cooling_down = false;
        self.trigger_held = false;
    }
}
