//! Kinematic advance toward engagement range.
//!
//! A unit with a live target closes to its preferred standoff distance
//! and holds there; the step never overshoots past optimal range.
//! Stations and targetless units stay put.

use std::collections::HashMap;

use armada_core::constants::MOVED_EPSILON;
use armada_core::delta::MovedUnit;
use armada_core::unit::BattleUnit;

/// Advance positions for one tick. Returns the units that moved.
pub fn run(
    units: &mut [BattleUnit],
    id_index: &HashMap<u32, usize>,
    dt: f32,
) -> Vec<MovedUnit> {
    let mut moved = Vec::new();

    for idx in 0..units.len() {
        if !units[idx].alive {
            continue;
        }

        let target_pos = units[idx]
            .target_id
            .and_then(|tid| id_index.get(&tid))
            .map(|&t| &units[t])
            .filter(|t| t.alive)
            .map(|t| (t.pos_x, t.pos_y, t.pos_z));

        let unit = &mut units[idx];

        if unit.is_station {
            unit.vel_x = 0.0;
            unit.vel_y = 0.0;
            unit.vel_z = 0.0;
            continue;
        }

        let Some((tx, ty, tz)) = target_pos else {
            unit.vel_x = 0.0;
            unit.vel_y = 0.0;
            unit.vel_z = 0.0;
            continue;
        };

        let dx = tx - unit.pos_x;
        let dy = ty - unit.pos_y;
        let dz = tz - unit.pos_z;
        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
        let standoff = unit.optimal_range();

        if dist <= standoff || dist <= f32::EPSILON {
            unit.vel_x = 0.0;
            unit.vel_y = 0.0;
            unit.vel_z = 0.0;
            continue;
        }

        let step = (unit.max_speed * dt).min(dist - standoff);
        let scale = step / dist;

        unit.pos_x += dx * scale;
        unit.pos_y += dy * scale;
        unit.pos_z += dz * scale;

        if dt > 0.0 {
            unit.vel_x = dx * scale / dt;
            unit.vel_y = dy * scale / dt;
            unit.vel_z = dz * scale / dt;
        }

        if step > MOVED_EPSILON {
            moved.push(MovedUnit {
                id: unit.id,
                x: unit.pos_x,
                y: unit.pos_y,
                z: unit.pos_z,
            });
        }
    }

    moved
}
