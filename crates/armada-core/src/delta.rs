//! Per-tick delta records returned by the simulator.
//!
//! A delta describes only what changed during one tick; subscribers
//! reconstruct battle state by applying the stream in tick order.

use serde::{Deserialize, Serialize};

/// Everything one `step` produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickDelta {
    pub tick: u64,
    pub moved: Vec<MovedUnit>,
    pub damaged: Vec<DamagedUnit>,
    pub destroyed: Vec<DestroyedUnit>,
    pub weapons_fired: Vec<WeaponFired>,
    /// True when nothing moved, fired, or took damage this tick and no
    /// weapon becomes ready before some future instant. The manager
    /// uses this to stop ticking the battle until that instant.
    pub is_idle: bool,
}

impl TickDelta {
    /// Whether the tick produced any observable activity.
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
            && self.damaged.is_empty()
            && self.destroyed.is_empty()
            && self.weapons_fired.is_empty()
    }
}

/// A unit whose position changed this tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovedUnit {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A unit that took damage this tick. `attacker_id` is the last unit
/// that hit it within the tick; `hp` and `shield` are the post-tick
/// values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamagedUnit {
    pub id: u32,
    pub hp: f32,
    pub shield: f32,
    pub attacker_id: u32,
}

/// A unit destroyed this tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestroyedUnit {
    pub id: u32,
    pub destroyed_by: u32,
}

/// One weapon discharge. `impact_time_ms` tells visualizers when the
/// logically-instant hit should appear to land, based on the weapon
/// category's travel speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponFired {
    pub attacker_id: u32,
    pub target_id: u32,
    pub weapon_tag: String,
    pub impact_time_ms: u32,
}
