//! Simulation constants and tuning parameters.

/// Scheduler tick rate (Hz).
pub const TICK_RATE: u32 = 20;

/// Scheduler period in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 1000 / TICK_RATE as u64;

/// Nominal seconds per tick. The actual `dt` handed to a simulator is
/// measured from the wall clock, so a late scheduler firing simply
/// produces a larger step.
pub const NOMINAL_DT: f64 = 1.0 / TICK_RATE as f64;

// --- Spatial index ---

/// Uniform grid cell edge length (world units).
pub const GRID_CELL_SIZE: f32 = 100.0;

/// Below this many grid candidates, targeting falls back to a linear
/// scan over all alive enemies. Grid cells starve at weapon ranges far
/// beyond the cell size, and a starved prefilter must not blind a unit.
pub const GRID_FALLBACK_THRESHOLD: usize = 5;

// --- Targeting ---

/// Armed units re-evaluate their target every this many ticks
/// (2 seconds at 20 Hz), even while the current target stays valid.
pub const RETARGET_INTERVAL_TICKS: u64 = 40;

/// Class weights for target scoring. Scores divide by distance, so a
/// weight ratio bounded well under any realistic distance ratio keeps
/// the choice distance-dominant: a station sitting next to an attacker
/// outscores an armed ship twice as far away.
pub const TARGET_WEIGHT_ARMED_SHIP: f32 = 2.0;
pub const TARGET_WEIGHT_ARMED_STATION: f32 = 1.8;
pub const TARGET_WEIGHT_UNARMED_SHIP: f32 = 1.5;
pub const TARGET_WEIGHT_UNARMED_STATION: f32 = 1.2;

// --- Movement ---

/// Positions that change by less than this in one tick are not
/// reported in the `moved` delta.
pub const MOVED_EPSILON: f32 = 0.01;

/// An external position override larger than this clears the unit's
/// target: the spatial premise behind the old choice is gone.
pub const SIGNIFICANT_MOVEMENT_THRESHOLD: f32 = 50.0;

// --- Projectile visualization speeds (world units per second) ---

/// Missile flight speed for client-side impact timing.
pub const MISSILE_SPEED: f32 = 300.0;

/// Torpedo flight speed for client-side impact timing.
pub const TORPEDO_SPEED: f32 = 150.0;

/// Any projectile tag without a dedicated entry flies at this speed.
pub const DEFAULT_PROJECTILE_SPEED: f32 = 800.0;

// --- Manager timing ---

/// While idle, a battle is only re-evaluated this often.
pub const IDLE_CHECK_INTERVAL_SECS: f64 = 0.5;

/// Timeout checks run this often per battle, idle or not.
pub const TIMEOUT_CHECK_INTERVAL_SECS: f64 = 10.0;

/// Absolute wall-clock ceiling on battle duration.
pub const MAX_BATTLE_DURATION_SECS: f64 = 30.0 * 60.0;

/// A battle with no damage for this long is a stalemate.
pub const STALEMATE_WINDOW_SECS: f64 = 5.0 * 60.0;

/// Ended battles stay queryable for this long before being purged.
pub const RETENTION_SECS: f64 = 60.0;
