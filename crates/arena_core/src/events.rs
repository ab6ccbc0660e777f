//! Outbound notifications for the presentation layer.
//!
//! The core never talks to UI, audio, or animation directly. Every
//! observable state change is pushed onto an [`EventQueue`] as a
//! [`CombatEvent`]; the host drains it after each action or tick and routes
//! the events to HUD widgets, sound cues, and physics.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::world::EntityId;

/// A state change worth showing, playing, or applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Magazine/reserve HUD refresh for a weapon slot.
    AmmoChanged {
        /// Weapon slot.
        slot: usize,
        /// Rounds in the magazine.
        magazine: u32,
        /// Magazine capacity.
        capacity: u32,
        /// Rounds in reserve.
        reserve: u32,
    },
    /// Health HUD refresh.
    HealthChanged {
        /// Current health.
        #[serde(with = "fixed_serde")]
        current: Fixed,
        /// Maximum health.
        #[serde(with = "fixed_serde")]
        max: Fixed,
    },
    /// Armor HUD refresh.
    ArmorChanged {
        /// Current armor.
        #[serde(with = "fixed_serde")]
        current: Fixed,
        /// Maximum armor.
        #[serde(with = "fixed_serde")]
        max: Fixed,
    },
    /// Dash charge HUD refresh.
    DashChargesChanged {
        /// Charges available.
        current: u32,
        /// Charge capacity.
        max: u32,
    },
    /// Chainsaw fuel HUD refresh.
    FuelChanged {
        /// Fuel units available.
        current: u32,
        /// Fuel capacity.
        max: u32,
    },
    /// Area attack cooldown HUD refresh (0 = just used, 1 = ready).
    AreaCooldownChanged {
        /// Recharged fraction.
        #[serde(with = "fixed_serde")]
        ready_fraction: Fixed,
    },
    /// A weapon fired: muzzle flash, sound, firing animation.
    FiringEffect {
        /// Weapon slot.
        slot: usize,
    },
    /// Trigger pulled with nothing to fire.
    DryFire {
        /// Weapon slot.
        slot: usize,
    },
    /// Camera recoil kick.
    Recoil {
        /// Kick amount (negative pitches up).
        #[serde(with = "fixed_serde")]
        amount: Fixed,
    },
    /// A weapon started reloading.
    ReloadStarted {
        /// Weapon slot.
        slot: usize,
    },
    /// The active weapon changed.
    WeaponSwitched {
        /// Previously active slot.
        from: usize,
        /// Newly active slot.
        to: usize,
    },
    /// Launch the combatant's body (dash or air jump).
    Launched {
        /// Launch velocity.
        velocity: Vec3Fixed,
        /// Replace horizontal velocity instead of adding to it.
        override_xy: bool,
        /// Replace vertical velocity instead of adding to it.
        override_z: bool,
    },
    /// Perform a regular grounded jump.
    Jumped,
    /// Invulnerability toggled.
    InvulnerabilityChanged {
        /// New state.
        active: bool,
    },
    /// A hostile was executed.
    Executed {
        /// Target entity.
        target: EntityId,
    },
    /// A hostile was killed with the chainsaw.
    ChainsawKill {
        /// Target entity.
        target: EntityId,
    },
    /// The area attack fired.
    AreaAttack {
        /// Number of hostiles set burning.
        targets: u32,
    },
    /// The combatant died.
    Died,
}

/// FIFO of pending [`CombatEvent`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQueue {
    events: Vec<CombatEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pending events without consuming them.
    #[must_use]
    pub fn pending(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
