//! Data-driven combatant and weapon tuning.
//!
//! Every tunable number lives in a plain serde struct so a loadout can be
//! authored in RON and handed to [`Combatant::new`](crate::combatant::Combatant::new).
//! Defaults reproduce the shipped arena tuning. Durations are in simulation
//! ticks (see [`TICK_RATE`](crate::timer::TICK_RATE)); distances in world
//! units (centimetres); angles in degrees.
//!
//! Configuration problems are the only errors this crate reports, and they
//! are reported once, by [`CombatantConfig::validate`], before a combatant
//! exists.
//!
//! # Example RON
//!
//! ```ron
//! CombatantConfig(
//!     dash: DashConfig(max_charges: 3),
//!     weapons: [
//!         WeaponDescriptor(
//!             name: "super_shotgun",
//!             magazine_size: 2,
//!             max_reserve: 30,
//!             initial_reserve: 30,
//!             refire_ticks: 48,
//!             reload_ticks: 36,
//!             recoil: -2.0,
//!             fire_mode: MultiPellet(
//!                 hitscan: HitscanParams(damage: 12.0),
//!                 pellet_count: 8,
//!                 spread_half_angle: 8.0,
//!             ),
//!         ),
//!     ],
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};
use crate::world::DamageKind;

/// Hitscan ray parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitscanParams {
    /// Maximum ray length.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Damage per ray that strikes a combatant.
    #[serde(with = "fixed_decimal")]
    pub damage: Fixed,
    /// Damage classification.
    pub damage_kind: DamageKind,
    /// Impulse magnitude applied to struck physics bodies.
    #[serde(with = "fixed_decimal")]
    pub impulse: Fixed,
    /// Distance ahead of the muzzle where rays start.
    #[serde(with = "fixed_decimal")]
    pub muzzle_offset: Fixed,
}

impl Default for HitscanParams {
    fn default() -> Self {
        Self {
            range: Fixed::from_num(5000),
            damage: Fixed::from_num(25),
            damage_kind: DamageKind::Ballistic,
            impulse: Fixed::from_num(100),
            muzzle_offset: Fixed::from_num(10),
        }
    }
}

/// Projectile spawn parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileParams {
    /// Flight speed in units per second.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,
    /// Damage on impact.
    #[serde(with = "fixed_decimal")]
    pub damage: Fixed,
    /// Damage classification.
    pub damage_kind: DamageKind,
}

impl Default for ProjectileParams {
    fn default() -> Self {
        Self {
            speed: Fixed::from_num(3000),
            damage: Fixed::from_num(100),
            damage_kind: DamageKind::Explosive,
        }
    }
}

/// How a weapon turns a trigger pull into hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireMode {
    /// One ray along the aim direction.
    Hitscan(HitscanParams),
    /// Several independent rays spread inside a cone; one round per volley.
    MultiPellet {
        /// Per-pellet ray parameters.
        hitscan: HitscanParams,
        /// Rays per trigger pull.
        pellet_count: u32,
        /// Spread cone half angle in degrees.
        #[serde(with = "fixed_decimal")]
        spread_half_angle: Fixed,
    },
    /// Ask the runtime to spawn a projectile.
    Projectile(ProjectileParams),
}

impl Default for FireMode {
    fn default() -> Self {
        Self::Hitscan(HitscanParams::default())
    }
}

/// Static description of one weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponDescriptor {
    /// Identifier used in logs and scenarios.
    pub name: String,
    /// Magazine capacity.
    pub magazine_size: u32,
    /// Reserve ammo ceiling.
    pub max_reserve: u32,
    /// Reserve ammo at spawn.
    pub initial_reserve: u32,
    /// Ticks between shots.
    pub refire_ticks: u32,
    /// Keep firing while the trigger is held.
    pub automatic: bool,
    /// Ticks to reload from reserve.
    pub reload_ticks: u32,
    /// Reload from reserve automatically when the magazine runs dry.
    pub auto_reload: bool,
    /// Recoil kick per shot.
    #[serde(with = "fixed_decimal")]
    pub recoil: Fixed,
    /// Fire mode and its parameters.
    pub fire_mode: FireMode,
}

impl Default for WeaponDescriptor {
    fn default() -> Self {
        Self {
            name: "weapon".to_string(),
            magazine_size: 10,
            max_reserve: 50,
            initial_reserve: 50,
            refire_ticks: 30,
            automatic: false,
            reload_ticks: 30,
            auto_reload: true,
            recoil: Fixed::from_num(-1),
            fire_mode: FireMode::default(),
        }
    }
}

impl WeaponDescriptor {
    /// Double-barrel shotgun: two shells, eight pellets per shell.
    #[must_use]
    pub fn super_shotgun() -> Self {
        Self {
            name: "super_shotgun".to_string(),
            magazine_size: 2,
            max_reserve: 30,
            initial_reserve: 30,
            refire_ticks: 48,
            automatic: false,
            reload_ticks: 36,
            auto_reload: true,
            recoil: Fixed::from_num(-2),
            fire_mode: FireMode::MultiPellet {
                hitscan: HitscanParams {
                    damage: Fixed::from_num(12),
                    ..HitscanParams::default()
                },
                pellet_count: 8,
                spread_half_angle: Fixed::from_num(8),
            },
        }
    }

    /// Automatic hitscan rifle.
    #[must_use]
    pub fn heavy_rifle() -> Self {
        Self {
            name: "heavy_rifle".to_string(),
            magazine_size: 30,
            max_reserve: 150,
            initial_reserve: 90,
            refire_ticks: 6,
            automatic: true,
            reload_ticks: 30,
            auto_reload: true,
            recoil: Fixed::from_num(-0.5),
            fire_mode: FireMode::Hitscan(HitscanParams::default()),
        }
    }

    /// Single-shot rocket launcher.
    #[must_use]
    pub fn rocket_launcher() -> Self {
        Self {
            name: "rocket_launcher".to_string(),
            magazine_size: 1,
            max_reserve: 12,
            initial_reserve: 6,
            refire_ticks: 45,
            automatic: false,
            reload_ticks: 45,
            auto_reload: true,
            recoil: Fixed::from_num(-3),
            fire_mode: FireMode::Projectile(ProjectileParams::default()),
        }
    }

    /// Check the descriptor for values the state machine cannot run with.
    pub fn validate(&self, field: &str) -> Result<()> {
        if self.magazine_size == 0 {
            return Err(GameError::invalid_config(
                format!("{field}.magazine_size"),
                "must be at least 1",
            ));
        }
        if self.initial_reserve > self.max_reserve {
            return Err(GameError::invalid_config(
                format!("{field}.initial_reserve"),
                format!("exceeds max_reserve ({})", self.max_reserve),
            ));
        }
        if self.refire_ticks == 0 {
            return Err(GameError::invalid_config(
                format!("{field}.refire_ticks"),
                "must be at least 1",
            ));
        }
        if self.reload_ticks == 0 {
            return Err(GameError::invalid_config(
                format!("{field}.reload_ticks"),
                "must be at least 1",
            ));
        }
        if let FireMode::MultiPellet {
            pellet_count,
            spread_half_angle,
            ..
        } = &self.fire_mode
        {
            if *pellet_count == 0 {
                return Err(GameError::invalid_config(
                    format!("{field}.fire_mode.pellet_count"),
                    "must be at least 1",
                ));
            }
            if *spread_half_angle < Fixed::ZERO || *spread_half_angle >= Fixed::from_num(90) {
                return Err(GameError::invalid_config(
                    format!("{field}.fire_mode.spread_half_angle"),
                    "must be in [0, 90) degrees",
                ));
            }
        }
        Ok(())
    }
}

/// Health tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Maximum (and starting) health.
    #[serde(with = "fixed_decimal")]
    pub max: Fixed,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max: Fixed::from_num(100),
        }
    }
}

/// Armor tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmorConfig {
    /// Armor ceiling.
    #[serde(with = "fixed_decimal")]
    pub max: Fixed,
    /// Armor at spawn.
    #[serde(with = "fixed_decimal")]
    pub initial: Fixed,
    /// Fraction of incoming damage armor soaks up (0..=1).
    #[serde(with = "fixed_decimal")]
    pub absorption: Fixed,
}

impl Default for ArmorConfig {
    fn default() -> Self {
        Self {
            max: Fixed::from_num(100),
            initial: Fixed::ZERO,
            absorption: Fixed::from_num(0.5),
        }
    }
}

/// Dash tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Launch speed.
    #[serde(with = "fixed_decimal")]
    pub impulse: Fixed,
    /// Charge capacity.
    pub max_charges: u32,
    /// Ticks to restore one charge.
    pub recharge_ticks: u32,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            impulse: Fixed::from_num(2000),
            max_charges: 2,
            recharge_ticks: 90,
        }
    }
}

/// Execute (glory kill) tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteConfig {
    /// Reach to a staggered hostile.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Invulnerability after an execute.
    pub invuln_ticks: u32,
    /// Health restored per execute.
    #[serde(with = "fixed_decimal")]
    pub health_restore: Fixed,
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            range: Fixed::from_num(250),
            invuln_ticks: 30,
            health_restore: Fixed::from_num(50),
        }
    }
}

/// Chainsaw (refuel-kill) tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainsawConfig {
    /// Fuel capacity (and starting fuel).
    pub max_fuel: u32,
    /// Reach to a hostile.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Reserve ammo granted to every weapon per kill.
    pub ammo_restore: u32,
}

impl Default for ChainsawConfig {
    fn default() -> Self {
        Self {
            max_fuel: 3,
            range: Fixed::from_num(200),
            ammo_restore: 10,
        }
    }
}

/// Area attack (flame belch) tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaAttackConfig {
    /// Ticks before the attack is ready again.
    pub cooldown_ticks: u32,
    /// Cone length.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Cone half angle in degrees.
    #[serde(with = "fixed_decimal")]
    pub half_angle: Fixed,
    /// Burning duration applied to each target.
    pub burn_ticks: u32,
}

impl Default for AreaAttackConfig {
    fn default() -> Self {
        Self {
            cooldown_ticks: 900,
            range: Fixed::from_num(600),
            half_angle: Fixed::from_num(30),
            burn_ticks: 300,
        }
    }
}

/// Jump tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Air jumps allowed before landing (1 = double jump).
    pub extra_jumps: u32,
    /// Upward launch speed of an air jump.
    #[serde(with = "fixed_decimal")]
    pub jump_velocity: Fixed,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            extra_jumps: 1,
            jump_velocity: Fixed::from_num(600),
        }
    }
}

/// Complete combatant tuning and loadout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatantConfig {
    /// Health tuning.
    pub health: HealthConfig,
    /// Armor tuning.
    pub armor: ArmorConfig,
    /// Dash tuning.
    pub dash: DashConfig,
    /// Execute tuning.
    pub execute: ExecuteConfig,
    /// Chainsaw tuning.
    pub chainsaw: ChainsawConfig,
    /// Area attack tuning.
    pub area_attack: AreaAttackConfig,
    /// Jump tuning.
    pub jump: JumpConfig,
    /// Owned weapons, in slot order.
    pub weapons: Vec<WeaponDescriptor>,
    /// Slot active at spawn.
    pub active_weapon: usize,
    /// Seed for pellet spread.
    pub seed: u64,
}

impl Default for CombatantConfig {
    fn default() -> Self {
        Self {
            health: HealthConfig::default(),
            armor: ArmorConfig::default(),
            dash: DashConfig::default(),
            execute: ExecuteConfig::default(),
            chainsaw: ChainsawConfig::default(),
            area_attack: AreaAttackConfig::default(),
            jump: JumpConfig::default(),
            weapons: vec![
                WeaponDescriptor::super_shotgun(),
                WeaponDescriptor::heavy_rifle(),
                WeaponDescriptor::rocket_launcher(),
            ],
            active_weapon: 0,
            seed: 0x5EED,
        }
    }
}

impl CombatantConfig {
    /// Parse a config from RON.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::ConfigParse(e.to_string()))
    }

    /// Check every value the combatant depends on.
    pub fn validate(&self) -> Result<()> {
        if self.health.max <= Fixed::ZERO {
            return Err(GameError::invalid_config("health.max", "must be positive"));
        }
        if self.armor.max < Fixed::ZERO {
            return Err(GameError::invalid_config("armor.max", "must not be negative"));
        }
        if self.armor.absorption < Fixed::ZERO || self.armor.absorption > Fixed::ONE {
            return Err(GameError::invalid_config(
                "armor.absorption",
                "must be in [0, 1]",
            ));
        }
        if self.dash.max_charges == 0 {
            return Err(GameError::invalid_config(
                "dash.max_charges",
                "must be at least 1",
            ));
        }
        if self.dash.recharge_ticks == 0 {
            return Err(GameError::invalid_config(
                "dash.recharge_ticks",
                "must be at least 1",
            ));
        }
        if self.area_attack.cooldown_ticks == 0 {
            return Err(GameError::invalid_config(
                "area_attack.cooldown_ticks",
                "must be at least 1",
            ));
        }
        if self.area_attack.half_angle < Fixed::ZERO
            || self.area_attack.half_angle > Fixed::from_num(180)
        {
            return Err(GameError::invalid_config(
                "area_attack.half_angle",
                "must be in [0, 180] degrees",
            ));
        }
        if self.weapons.is_empty() {
            return Err(GameError::invalid_config(
                "weapons",
                "a combatant needs at least one weapon",
            ));
        }
        if self.active_weapon >= self.weapons.len() {
            return Err(GameError::invalid_config(
                "active_weapon",
                format!(
                    "slot {} out of range for {} weapons",
                    self.active_weapon,
                    self.weapons.len()
                ),
            ));
        }
        for (slot, weapon) in self.weapons.iter().enumerate() {
            weapon.validate(&format!("weapons[{slot}]"))?;
        }
        Ok(())
    }
}
