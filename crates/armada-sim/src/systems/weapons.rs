//! Weapon firing and damage resolution.
//!
//! Firing decisions are collected against the unit table as it stood
//! after movement, then applied in one pass. A shot lands iff the
//! weapon is off cooldown, the target is inside the weapon's range,
//! and the weapon can penetrate the target's armor tier; armor is a
//! gate, never a damage reduction.

use std::collections::HashMap;

use log::debug;

use armada_core::constants::{DEFAULT_PROJECTILE_SPEED, MISSILE_SPEED, TORPEDO_SPEED};
use armada_core::delta::{DamagedUnit, DestroyedUnit, WeaponFired};
use armada_core::unit::BattleUnit;

/// What the weapon phase produced for one tick.
#[derive(Debug, Default)]
pub struct CombatResult {
    pub weapons_fired: Vec<WeaponFired>,
    pub damaged: Vec<DamagedUnit>,
    pub destroyed: Vec<DestroyedUnit>,
    pub total_damage: f32,
}

impl CombatResult {
    pub fn is_empty(&self) -> bool {
        self.weapons_fired.is_empty()
            && self.damaged.is_empty()
            && self.destroyed.is_empty()
    }
}

struct Shot {
    attacker: usize,
    target: usize,
    weapon: usize,
    damage: f32,
    distance: f32,
}

/// Resolve every armed unit's weapons against its target.
pub fn run(
    units: &mut [BattleUnit],
    id_index: &HashMap<u32, usize>,
    now: f64,
) -> CombatResult {
    // Phase 1: decide which weapons discharge, against the stable
    // post-movement view of the table.
    let mut shots: Vec<Shot> = Vec::new();
    let mut stale_targets: Vec<usize> = Vec::new();

    for attacker_idx in 0..units.len() {
        let attacker = &units[attacker_idx];
        if !attacker.alive || !attacker.can_attack() {
            continue;
        }
        let Some(target_id) = attacker.target_id else {
            continue;
        };
        let Some(&target_idx) = id_index.get(&target_id) else {
            stale_targets.push(attacker_idx);
            continue;
        };
        let target = &units[target_idx];
        if !target.alive {
            // Target died since acquisition; clear it so next tick
            // re-acquires instead of dry-firing at wreckage.
            stale_targets.push(attacker_idx);
            continue;
        }

        let distance = attacker.distance(target);

        for (weapon_idx, weapon) in attacker.weapons.iter().enumerate() {
            if !weapon.is_ready(now) {
                continue;
            }
            if distance > weapon.max_range {
                continue;
            }
            if weapon.target_armor_max < target.armor {
                continue;
            }
            // Siege ordnance is wasted on ships.
            if is_siege_weapon(&weapon.tag) && !target.is_station {
                continue;
            }

            shots.push(Shot {
                attacker: attacker_idx,
                target: target_idx,
                weapon: weapon_idx,
                damage: weapon.damage_per_shot(),
                distance,
            });
        }
    }

    for idx in stale_targets {
        units[idx].target_id = None;
    }

    // Phase 2: apply in attacker order. A target killed mid-pass
    // absorbs nothing further, so overkill is never credited.
    let mut result = CombatResult::default();
    let mut damage_order: Vec<usize> = Vec::new();
    let mut last_attacker: HashMap<usize, u32> = HashMap::new();

    for shot in &shots {
        let attacker_id = units[shot.attacker].id;
        let weapon_tag = units[shot.attacker].weapons[shot.weapon].tag.clone();
        units[shot.attacker].weapons[shot.weapon].last_fired = now;

        result.weapons_fired.push(WeaponFired {
            attacker_id,
            target_id: units[shot.target].id,
            impact_time_ms: impact_time_ms(shot.distance, &weapon_tag),
            weapon_tag,
        });

        let was_alive = units[shot.target].alive;
        let dealt = units[shot.target].take_damage(shot.damage);
        units[shot.attacker].damage_dealt += dealt;
        result.total_damage += dealt;

        if dealt > 0.0 {
            if !damage_order.contains(&shot.target) {
                damage_order.push(shot.target);
            }
            last_attacker.insert(shot.target, attacker_id);
        }

        if was_alive && !units[shot.target].alive {
            debug!(
                "unit {} destroyed by {} ({})",
                units[shot.target].id,
                attacker_id,
                units[shot.target].unit_type
            );
            result.destroyed.push(DestroyedUnit {
                id: units[shot.target].id,
                destroyed_by: attacker_id,
            });
        }
    }

    // Survivors that took fire this tick, in first-hit order.
    for target_idx in damage_order {
        let target = &units[target_idx];
        if !target.alive {
            continue; // reported under destroyed instead
        }
        result.damaged.push(DamagedUnit {
            id: target.id,
            hp: target.hp,
            shield: target.shield,
            attacker_id: last_attacker[&target_idx],
        });
    }

    // Anyone aiming at a fresh wreck re-acquires next tick.
    if !result.destroyed.is_empty() {
        let dead: Vec<u32> = result.destroyed.iter().map(|d| d.id).collect();
        for unit in units.iter_mut() {
            if let Some(tid) = unit.target_id {
                if dead.contains(&tid) {
                    unit.target_id = None;
                }
            }
        }
    }

    result
}

/// Whether a weapon tag marks siege ordnance (station-busting only).
#[inline]
pub fn is_siege_weapon(tag: &str) -> bool {
    let tag = tag.to_lowercase();
    tag.contains("siege") || tag.contains("nuke")
}

/// Projectile travel speed for a weapon tag, or None for beams that
/// land instantly.
pub fn projectile_speed(tag: &str) -> Option<f32> {
    let tag = tag.to_lowercase();
    if tag.contains("laser") || tag.contains("beam") {
        None
    } else if tag.contains("missile") {
        Some(MISSILE_SPEED)
    } else if tag.contains("torpedo") {
        Some(TORPEDO_SPEED)
    } else {
        Some(DEFAULT_PROJECTILE_SPEED)
    }
}

/// Client-side impact delay in milliseconds for a shot at `distance`.
#[inline]
pub fn impact_time_ms(distance: f32, tag: &str) -> u32 {
    match projectile_speed(tag) {
        None => 0,
        Some(speed) => ((distance / speed) * 1000.0) as u32,
    }
}
