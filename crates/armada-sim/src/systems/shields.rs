//! End-of-tick shield regeneration.

use armada_core::unit::BattleUnit;

/// Regenerate every living unit's shields for one tick.
pub fn run(units: &mut [BattleUnit], dt: f32) {
    for unit in units.iter_mut() {
        unit.regen_shield(dt);
    }
}
