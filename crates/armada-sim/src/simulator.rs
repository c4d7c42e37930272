//! The per-battle simulator: owns one battle's unit table, spatial
//! index, and RNG, and advances it one tick at a time.

use std::collections::HashMap;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use armada_core::constants::{GRID_CELL_SIZE, SIGNIFICANT_MOVEMENT_THRESHOLD};
use armada_core::delta::TickDelta;
use armada_core::unit::{BattleUnit, PositionUpdate};

use crate::grid::SpatialGrid;
use crate::systems;

/// One battle's simulation state.
///
/// The unit table is a dense vector; units keep their slot for the
/// battle's lifetime (the dead stay in place with `alive = false`), so
/// the secondary id-to-index map never goes stale and tick iteration
/// stays contiguous.
pub struct BattleSimulator {
    units: Vec<BattleUnit>,
    id_index: HashMap<u32, usize>,
    grid: SpatialGrid,
    tick: u64,
    rng: ChaCha8Rng,
}

impl BattleSimulator {
    /// Build a simulator from ingress unit records.
    ///
    /// Every record is normalized, and each weapon that has never
    /// fired gets its `last_fired` drawn uniformly from the cooldown
    /// interval ending at `now` — a freshly loaded fleet must not
    /// open with one synchronized volley. The draw comes from a
    /// `ChaCha8Rng` seeded with `seed`, so identical inputs replay
    /// identically.
    pub fn new(units: Vec<BattleUnit>, seed: u64, now: f64) -> Self {
        let mut sim = Self {
            units: Vec::with_capacity(units.len()),
            id_index: HashMap::with_capacity(units.len()),
            grid: SpatialGrid::new(GRID_CELL_SIZE),
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };

        for unit in units {
            sim.add_unit(unit, now);
        }

        let ships = sim.units.iter().filter(|u| u.is_ship).count();
        let stations = sim.units.iter().filter(|u| u.is_station).count();
        let armed = sim.units.iter().filter(|u| u.has_weapons).count();
        debug!(
            "simulator created: {} units ({} ships, {} stations, {} armed)",
            sim.units.len(),
            ships,
            stations,
            armed
        );

        sim
    }

    /// Normalize and insert one unit. Returns false (and changes
    /// nothing) when the id is already taken in this battle.
    pub fn add_unit(&mut self, mut unit: BattleUnit, now: f64) -> bool {
        if self.id_index.contains_key(&unit.id) {
            log::warn!("dropping duplicate unit id {}", unit.id);
            return false;
        }

        unit.normalize();
        for weapon in &mut unit.weapons {
            if weapon.last_fired == 0.0 && weapon.cooldown > 0.0 {
                let r: f64 = self.rng.gen();
                weapon.last_fired = (now - weapon.cooldown as f64) + r * weapon.cooldown as f64;
            }
        }

        self.id_index.insert(unit.id, self.units.len());
        self.units.push(unit);
        true
    }

    /// Advance the battle by `dt` seconds of simulated time at wall
    /// time `now`.
    ///
    /// Phase order is observable in the delta stream and fixed:
    /// spatial rebuild, targeting, movement, weapons and damage,
    /// shield regeneration, delta assembly.
    pub fn step(&mut self, dt: f32, now: f64) -> TickDelta {
        self.tick += 1;

        self.grid.rebuild(&self.units);

        systems::targeting::run(&mut self.units, &self.grid, &self.id_index, self.tick);

        let moved = systems::movement::run(&mut self.units, &self.id_index, dt);

        let combat = systems::weapons::run(&mut self.units, &self.id_index, now);

        systems::shields::run(&mut self.units, dt);

        if self.tick % 20 == 0 {
            let alive = self.units.iter().filter(|u| u.alive).count();
            let targeting = self
                .units
                .iter()
                .filter(|u| u.alive && u.target_id.is_some())
                .count();
            debug!(
                "tick {}: alive={}, targeting={}, fired={}, dt={:.3}s",
                self.tick,
                alive,
                targeting,
                combat.weapons_fired.len(),
                dt
            );
        }

        let quiet = moved.is_empty() && combat.is_empty();
        let is_idle = quiet
            && match self.next_weapon_ready_time(now) {
                Some(ready) => ready > now,
                // Nothing pending: only an external mutation (or a
                // timeout) can change this battle's state.
                None => true,
            };

        TickDelta {
            tick: self.tick,
            moved,
            damaged: combat.damaged,
            destroyed: combat.destroyed,
            weapons_fired: combat.weapons_fired,
            is_idle,
        }
    }

    // --- External mutations -------------------------------------------------

    /// Overwrite positions for the listed units. Returns how many were
    /// found alive and updated.
    pub fn update_positions(&mut self, updates: &[PositionUpdate]) -> usize {
        updates
            .iter()
            .filter(|u| self.update_single_position(u.id, u.x, u.y, u.z, u.clear_target))
            .count()
    }

    /// Overwrite one unit's position. External overrides cancel any
    /// internally computed velocity, and a move large enough to break
    /// the spatial premise behind the current target also clears it.
    pub fn update_single_position(
        &mut self,
        unit_id: u32,
        x: f32,
        y: f32,
        z: f32,
        clear_target: bool,
    ) -> bool {
        let Some(&idx) = self.id_index.get(&unit_id) else {
            return false;
        };
        let unit = &mut self.units[idx];
        if !unit.alive {
            return false;
        }

        let dx = x - unit.pos_x;
        let dy = y - unit.pos_y;
        let dz = z - unit.pos_z;
        let moved = (dx * dx + dy * dy + dz * dz).sqrt();

        unit.pos_x = x;
        unit.pos_y = y;
        unit.pos_z = z;
        unit.vel_x = 0.0;
        unit.vel_y = 0.0;
        unit.vel_z = 0.0;

        if clear_target || moved > SIGNIFICANT_MOVEMENT_THRESHOLD {
            unit.target_id = None;
        }

        true
    }

    /// Clear every unit's target; next tick re-acquires from scratch.
    /// Returns how many targets were dropped.
    pub fn force_retarget_all(&mut self) -> u32 {
        let mut cleared = 0;
        for unit in &mut self.units {
            if unit.alive && unit.target_id.take().is_some() {
                cleared += 1;
            }
        }
        debug!("force retarget cleared {} targets", cleared);
        cleared
    }

    /// Clear one unit's target. Returns false when the unit is missing
    /// or dead.
    pub fn force_retarget_unit(&mut self, unit_id: u32) -> bool {
        match self.id_index.get(&unit_id) {
            Some(&idx) if self.units[idx].alive => {
                self.units[idx].target_id = None;
                true
            }
            _ => false,
        }
    }

    // --- Queries ------------------------------------------------------------

    /// Factions with at least one living unit, sorted ascending.
    pub fn active_factions(&self) -> Vec<u32> {
        let mut factions: Vec<u32> = self
            .units
            .iter()
            .filter(|u| u.alive)
            .map(|u| u.faction_id)
            .collect();
        factions.sort_unstable();
        factions.dedup();
        factions
    }

    /// Living unit count per faction.
    pub fn faction_counts(&self) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for unit in self.units.iter().filter(|u| u.alive) {
            *counts.entry(unit.faction_id).or_insert(0) += 1;
        }
        counts
    }

    /// A battle is over when at most one faction still stands.
    pub fn is_battle_ended(&self) -> bool {
        self.active_factions().len() <= 1
    }

    /// The sole surviving faction, if exactly one remains.
    pub fn victor(&self) -> Option<u32> {
        match self.active_factions().as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    /// The next strictly-future instant at which any living armed
    /// unit's weapon comes off cooldown. None when every weapon is
    /// already ready (or nobody is armed): with nothing pending, only
    /// an external mutation can make the battle act again.
    pub fn next_weapon_ready_time(&self, now: f64) -> Option<f64> {
        self.units
            .iter()
            .filter(|u| u.alive && u.can_attack())
            .flat_map(|u| u.weapons.iter())
            .map(|w| w.last_fired + w.cooldown as f64)
            .filter(|&ready| ready > now)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Current positions of living units, for state dumps.
    pub fn unit_positions(&self) -> Vec<PositionUpdate> {
        self.units
            .iter()
            .filter(|u| u.alive)
            .map(|u| PositionUpdate {
                id: u.id,
                x: u.pos_x,
                y: u.pos_y,
                z: u.pos_z,
                clear_target: false,
            })
            .collect()
    }

    /// Final unit records, damage totals included.
    pub fn results(&self) -> Vec<BattleUnit> {
        self.units.clone()
    }

    pub fn units(&self) -> &[BattleUnit] {
        &self.units
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn alive_count(&self) -> usize {
        self.units.iter().filter(|u| u.alive).count()
    }
}
