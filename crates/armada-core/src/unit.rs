//! The combat unit and weapon model.
//!
//! Units are stored as flat primitives rather than nested vectors so a
//! battle's unit table iterates contiguously; at several thousand units
//! per battle the tick budget is spent walking this struct.

use serde::{Deserialize, Serialize};

fn default_alive() -> bool {
    true
}

/// A single combat entity: ship or station.
///
/// This struct doubles as the ingress schema for `start` and
/// `reinforcements` payloads. Fields the game server may omit carry
/// serde defaults and are filled in by [`BattleUnit::normalize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleUnit {
    // Identity
    pub id: u32,
    pub faction_id: u32,
    #[serde(default)]
    pub player_id: Option<u32>,
    #[serde(default)]
    pub unit_type: String,
    #[serde(default)]
    pub is_ship: bool,
    #[serde(default)]
    pub is_station: bool,

    // Vitals
    pub max_hp: f32,
    pub hp: f32,
    pub max_shield: f32,
    pub shield: f32,
    /// Armor tier. Weapons can only hurt targets whose armor does not
    /// exceed their `target_armor_max`.
    pub armor: f32,
    /// Shield points regenerated per second.
    pub shield_regen: f32,

    // Kinematics (flat for cache efficiency)
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub vel_z: f32,
    pub max_speed: f32,

    // Weapons
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub has_weapons: bool,
    #[serde(default)]
    pub max_weapon_range: f32,

    // Combat state
    #[serde(default)]
    pub target_id: Option<u32>,
    #[serde(default = "default_alive")]
    pub alive: bool,

    // Running totals
    #[serde(default)]
    pub damage_dealt: f32,
    #[serde(default)]
    pub damage_taken: f32,
}

/// A firing capability owned by a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    /// String key used to pick the projectile speed for client-side
    /// impact timing ("laser", "missile", "torpedo", ...).
    pub tag: String,
    /// Damage per second at full cadence.
    pub dps: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Seconds between shots. Derived as `1 / fire_rate` when absent.
    #[serde(default)]
    pub cooldown: f32,
    pub max_range: f32,
    pub optimal_range: f32,
    /// Highest armor tier this weapon can hurt.
    pub target_armor_max: f32,
    /// Wall-time stamp of the last discharge, in seconds. Zero on
    /// ingress; the simulator staggers it backwards so a fresh fleet
    /// does not open with one synchronized volley.
    #[serde(default)]
    pub last_fired: f64,
}

impl Weapon {
    /// Whether the cooldown has elapsed at `now`.
    #[inline]
    pub fn is_ready(&self, now: f64) -> bool {
        now - self.last_fired >= self.cooldown as f64
    }

    /// Damage delivered by one discharge: dps spread over the firing
    /// interval.
    #[inline]
    pub fn damage_per_shot(&self) -> f32 {
        if self.fire_rate > 0.0 {
            self.dps / self.fire_rate
        } else {
            self.dps
        }
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Weapon {
            tag: String::new(),
            dps: 10.0,
            fire_rate: 1.0,
            cooldown: 1.0,
            max_range: 100.0,
            optimal_range: 50.0,
            target_armor_max: 0.0,
            last_fired: 0.0,
        }
    }
}

impl BattleUnit {
    /// Make an externally-supplied record internally consistent.
    ///
    /// Fills derived fields the game server may have omitted: the
    /// armed flag, the aggregate weapon range, the ship/station
    /// classification, per-weapon cooldowns, and the alive flag.
    /// Total and idempotent: applying it twice changes nothing.
    pub fn normalize(&mut self) {
        if !self.has_weapons && !self.weapons.is_empty() {
            self.has_weapons = true;
        }

        if self.max_weapon_range <= 0.0 {
            self.max_weapon_range = self
                .weapons
                .iter()
                .map(|w| w.max_range)
                .fold(0.0f32, f32::max);
        }

        if !self.is_ship && !self.is_station {
            let label = self.unit_type.to_lowercase();
            if label.contains("station") || label.contains("outpost") || label.contains("platform")
            {
                self.is_station = true;
            } else {
                // Ambiguous classifications default to ship.
                self.is_ship = true;
            }
        }

        for weapon in &mut self.weapons {
            if weapon.cooldown <= 0.0 && weapon.fire_rate > 0.0 {
                weapon.cooldown = 1.0 / weapon.fire_rate;
            }
        }

        self.alive = self.hp > 0.0;
    }

    /// Squared distance to another unit (no sqrt).
    #[inline]
    pub fn distance_sq(&self, other: &BattleUnit) -> f32 {
        let dx = self.pos_x - other.pos_x;
        let dy = self.pos_y - other.pos_y;
        let dz = self.pos_z - other.pos_z;
        dx * dx + dy * dy + dz * dz
    }

    /// Distance to another unit.
    #[inline]
    pub fn distance(&self, other: &BattleUnit) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// Whether this unit can fire at all.
    #[inline]
    pub fn can_attack(&self) -> bool {
        self.has_weapons && !self.weapons.is_empty()
    }

    /// Whether any of this unit's weapons can hurt a target with the
    /// given armor tier.
    #[inline]
    pub fn can_damage(&self, armor: f32) -> bool {
        self.weapons.iter().any(|w| w.target_armor_max >= armor)
    }

    /// Preferred standoff distance: the largest optimal range across
    /// the unit's weapons (zero when unarmed).
    #[inline]
    pub fn optimal_range(&self) -> f32 {
        self.weapons
            .iter()
            .map(|w| w.optimal_range)
            .fold(0.0f32, f32::max)
    }

    /// Apply damage, shield first, remainder to hull. Returns the
    /// damage actually absorbed (shield plus hull), which is what the
    /// attacker gets credited with. Updates `damage_taken`, clamps
    /// both pools at zero, and drops the alive flag when the hull is
    /// gone.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if !self.alive || amount <= 0.0 {
            return 0.0;
        }

        let mut dealt = 0.0;
        let mut remaining = amount;

        if self.shield > 0.0 {
            let absorbed = remaining.min(self.shield);
            self.shield -= absorbed;
            dealt += absorbed;
            remaining -= absorbed;
        }

        if remaining > 0.0 {
            let hull = remaining.min(self.hp);
            self.hp -= hull;
            dealt += hull;
        }

        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.shield = 0.0;
            self.alive = false;
        }

        self.damage_taken += dealt;
        dealt
    }

    /// Regenerate shields for one tick. Dead units do not regenerate.
    #[inline]
    pub fn regen_shield(&mut self, dt: f32) {
        if self.alive && self.shield_regen > 0.0 && self.shield < self.max_shield {
            self.shield = (self.shield + self.shield_regen * dt).min(self.max_shield);
        }
    }
}

impl Default for BattleUnit {
    fn default() -> Self {
        BattleUnit {
            id: 0,
            faction_id: 0,
            player_id: None,
            unit_type: String::new(),
            is_ship: false,
            is_station: false,
            max_hp: 100.0,
            hp: 100.0,
            max_shield: 0.0,
            shield: 0.0,
            armor: 0.0,
            shield_regen: 0.0,
            pos_x: 0.0,
            pos_y: 0.0,
            pos_z: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            vel_z: 0.0,
            max_speed: 10.0,
            weapons: Vec::new(),
            has_weapons: false,
            max_weapon_range: 0.0,
            target_id: None,
            alive: true,
            damage_dealt: 0.0,
            damage_taken: 0.0,
        }
    }
}

/// External position override for one unit, applied between ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Also drop the unit's current target.
    #[serde(default)]
    pub clear_target: bool,
}
