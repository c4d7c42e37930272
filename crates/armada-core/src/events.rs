//! Broadcast events published to subscribers of a battle's system.

use serde::{Deserialize, Serialize};

use crate::delta::{DamagedUnit, DestroyedUnit, MovedUnit, WeaponFired};
use crate::state::BattleOutcome;

/// Events fanned out to every subscriber of the battle's `system_id`.
///
/// Serialized with a `type` tag carrying the wire name clients key on
/// (`battle:started`, `battle:tick`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BattleEvent {
    /// A battle began.
    #[serde(rename = "battle:started")]
    Started {
        battle_id: String,
        system_id: u64,
        unit_count: usize,
        factions: Vec<u32>,
    },
    /// One tick's worth of changes.
    #[serde(rename = "battle:tick")]
    Tick {
        battle_id: String,
        system_id: u64,
        tick: u64,
        moved: Vec<MovedUnit>,
        damaged: Vec<DamagedUnit>,
        destroyed: Vec<DestroyedUnit>,
        weapons_fired: Vec<WeaponFired>,
    },
    /// Units arrived mid-battle.
    #[serde(rename = "battle:reinforcements")]
    Reinforcements {
        battle_id: String,
        system_id: u64,
        reinforcements: Vec<ReinforcementEntry>,
    },
    /// The battle ended; terminal event for this battle_id.
    #[serde(rename = "battle:concluded")]
    Concluded {
        battle_id: String,
        system_id: u64,
        duration_ms: u64,
        total_ticks: u64,
        survivors: Vec<u32>,
        casualties: Vec<u32>,
        victor: Option<u32>,
        reason: String,
    },
}

impl BattleEvent {
    /// Build the terminal event from a finalized outcome.
    pub fn concluded(battle_id: &str, system_id: u64, outcome: &BattleOutcome) -> Self {
        BattleEvent::Concluded {
            battle_id: battle_id.to_string(),
            system_id,
            duration_ms: outcome.duration_ms,
            total_ticks: outcome.total_ticks,
            survivors: outcome.survivors.clone(),
            casualties: outcome.casualties.clone(),
            victor: outcome.victor,
            reason: outcome.reason.clone(),
        }
    }
}

/// Identity of a unit that joined mid-battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinforcementEntry {
    pub id: u32,
    pub faction_id: u32,
    pub player_id: Option<u32>,
}
