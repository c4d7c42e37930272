//! Target acquisition and validation.
//!
//! Every armed, alive unit should hold a valid target id whenever one
//! is reachable. A target is valid while it exists, lives, belongs to
//! another faction, sits inside the holder's weapon envelope, and at
//! least one of the holder's weapons can get through its armor.

use std::collections::HashMap;

use armada_core::constants::{
    GRID_FALLBACK_THRESHOLD, RETARGET_INTERVAL_TICKS, TARGET_WEIGHT_ARMED_SHIP,
    TARGET_WEIGHT_ARMED_STATION, TARGET_WEIGHT_UNARMED_SHIP, TARGET_WEIGHT_UNARMED_STATION,
};
use armada_core::unit::BattleUnit;

use crate::grid::SpatialGrid;

/// Run validation and acquisition for one tick.
///
/// Units re-evaluate when they have no target, their target went
/// invalid, or the periodic interval comes up — long engagements drift,
/// and a fleet stuck on its first acquisition never converges on the
/// closer threats.
pub fn run(
    units: &mut [BattleUnit],
    grid: &SpatialGrid,
    id_index: &HashMap<u32, usize>,
    tick: u64,
) {
    for idx in 0..units.len() {
        if !units[idx].alive || !units[idx].can_attack() {
            continue;
        }

        let current = units[idx].target_id;
        let needs_target = current.is_none()
            || tick % RETARGET_INTERVAL_TICKS == 0
            || !is_target_valid(&units[idx], current.unwrap(), units, id_index);

        if !needs_target {
            continue;
        }

        units[idx].target_id = None;
        if let Some(best) = find_best_target(idx, units, grid) {
            units[idx].target_id = Some(units[best].id);
        }
    }
}

/// Whether `target_id` is still a target the attacker may keep.
pub fn is_target_valid(
    attacker: &BattleUnit,
    target_id: u32,
    units: &[BattleUnit],
    id_index: &HashMap<u32, usize>,
) -> bool {
    let Some(&target_idx) = id_index.get(&target_id) else {
        return false;
    };
    let target = &units[target_idx];

    target.alive
        && target.faction_id != attacker.faction_id
        && attacker.distance_sq(target) <= attacker.max_weapon_range * attacker.max_weapon_range
        && attacker.can_damage(target.armor)
}

/// Pick the best enemy for `attacker_idx`, or None when nothing in
/// weapon range can be hurt.
///
/// Scoring divides a bounded class weight by distance, so the choice is
/// distance-dominant: a station parked next to the attacker beats an
/// armed ship further out instead of being masked by it. Ties break on
/// the lower unit id.
pub fn find_best_target(
    attacker_idx: usize,
    units: &[BattleUnit],
    grid: &SpatialGrid,
) -> Option<usize> {
    let attacker = &units[attacker_idx];
    if !attacker.alive || !attacker.can_attack() {
        return None;
    }

    let range = attacker.max_weapon_range;
    let candidates = grid.nearby(attacker.pos_x, attacker.pos_y, attacker.pos_z, range);

    // Grid cells starve when weapon range dwarfs the cell size; a
    // starved prefilter must not blind the unit, so scan everyone.
    if candidates.len() < GRID_FALLBACK_THRESHOLD {
        return select_target(attacker, units, 0..units.len());
    }
    select_target(attacker, units, candidates.into_iter())
}

fn select_target(
    attacker: &BattleUnit,
    units: &[BattleUnit],
    candidates: impl Iterator<Item = usize>,
) -> Option<usize> {
    let range_sq = attacker.max_weapon_range * attacker.max_weapon_range;

    let mut best: Option<usize> = None;
    let mut best_score = 0.0f32;

    for idx in candidates {
        if idx >= units.len() {
            continue;
        }
        let other = &units[idx];
        if other.id == attacker.id
            || !other.alive
            || other.faction_id == attacker.faction_id
            || !attacker.can_damage(other.armor)
        {
            continue;
        }

        let dist_sq = attacker.distance_sq(other);
        if dist_sq > range_sq {
            continue;
        }

        let score = class_weight(other) / (1.0 + dist_sq.sqrt());
        let better = match best {
            None => true,
            Some(current) => {
                score > best_score || (score == best_score && other.id < units[current].id)
            }
        };
        if better {
            best = Some(idx);
            best_score = score;
        }
    }

    best
}

#[inline]
fn class_weight(target: &BattleUnit) -> f32 {
    match (target.is_station, target.can_attack()) {
        (false, true) => TARGET_WEIGHT_ARMED_SHIP,
        (false, false) => TARGET_WEIGHT_UNARMED_SHIP,
        (true, true) => TARGET_WEIGHT_ARMED_STATION,
        (true, false) => TARGET_WEIGHT_UNARMED_STATION,
    }
}
