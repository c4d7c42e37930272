//! Uniform spatial grid for ranged neighbor queries.
//!
//! The grid is rebuilt once per tick before targeting runs, so it
//! reflects positions at the start of the tick; movement within the
//! tick is not re-indexed until the next rebuild. It is a coarse
//! prefilter: callers must apply exact distance checks to whatever it
//! returns.

use std::collections::HashMap;

use armada_core::unit::BattleUnit;

/// Uniform grid over 3-D space, keyed by integer cell coordinates.
/// Cells hold indices into the owning simulator's unit table.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<(i32, i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        }
    }

    #[inline]
    fn key(&self, x: f32, y: f32, z: f32) -> (i32, i32, i32) {
        (
            (x * self.inv_cell_size).floor() as i32,
            (y * self.inv_cell_size).floor() as i32,
            (z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Drop all cells and re-insert every alive unit.
    pub fn rebuild(&mut self, units: &[BattleUnit]) {
        self.cells.clear();
        for (idx, unit) in units.iter().enumerate() {
            if unit.alive {
                self.insert(idx, unit.pos_x, unit.pos_y, unit.pos_z);
            }
        }
    }

    /// Insert a unit index at a position.
    pub fn insert(&mut self, index: usize, x: f32, y: f32, z: f32) {
        let key = self.key(x, y, z);
        self.cells.entry(key).or_default().push(index);
    }

    /// Candidate unit indices within `radius` of a point.
    ///
    /// Enumerates the cube of cells covering the radius plus one cell
    /// of margin, so units sitting just across a cell boundary are
    /// never missed.
    pub fn nearby(&self, x: f32, y: f32, z: f32, radius: f32) -> Vec<usize> {
        let (cx, cy, cz) = self.key(x, y, z);
        let reach = (radius * self.inv_cell_size).ceil() as i32 + 1;

        let mut result = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    if let Some(cell) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        result.extend_from_slice(cell);
                    }
                }
            }
        }
        result
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// (occupied cells, total stored indices) — for diagnostics.
    pub fn stats(&self) -> (usize, usize) {
        let total: usize = self.cells.values().map(Vec::len).sum();
        (self.cells.len(), total)
    }
}
