//! Status views and final results reported by the battle manager.

use serde::{Deserialize, Serialize};

use crate::unit::BattleUnit;

/// Aggregate counters accumulated over a battle's lifetime.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BattleStats {
    pub weapons_fired: u64,
    pub units_destroyed: u32,
    pub total_damage: f32,
    pub reinforcements: u32,
}

/// Answer to a `status` query for one battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleStatus {
    pub battle_id: String,
    pub system_id: u64,
    pub tick: u64,
    pub duration_ms: u64,
    pub ended: bool,
    pub unit_count: usize,
    pub factions: Vec<u32>,
    pub is_idle: bool,
    pub stats: BattleStats,
    /// Present once the battle has ended, until retention expires.
    pub results: Option<BattleOutcome>,
}

/// One row of an `active_battles` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSummary {
    pub battle_id: String,
    pub system_id: u64,
    pub tick: u64,
    pub duration_ms: u64,
    pub unit_count: usize,
    pub factions: Vec<u32>,
    pub is_idle: bool,
}

/// Final accounting of an ended battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub duration_ms: u64,
    pub total_ticks: u64,
    /// Units still alive at the end.
    pub survivors: Vec<u32>,
    /// Units destroyed during the battle.
    pub casualties: Vec<u32>,
    /// The sole surviving faction, or None for a draw/timeout.
    pub victor: Option<u32>,
    /// Why the battle ended: "defeat", "stalemate_no_damage_5m",
    /// "max_duration_exceeded_30m", "stopped", "server_shutdown", ...
    pub reason: String,
    /// Final per-unit records, including damage totals.
    pub units: Vec<BattleUnit>,
}
