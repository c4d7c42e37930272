//! The battle manager: registry of concurrent battles, control-op
//! handling, per-firing tick sweep, and event publication.
//!
//! All methods take the current wall time as a parameter, so tests can
//! drive hours of battle through a synthetic clock.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use log::{error, info, warn};
use serde::Deserialize;

use armada_core::events::{BattleEvent, ReinforcementEntry};
use armada_core::state::{BattleStatus, BattleSummary};
use armada_core::unit::{BattleUnit, PositionUpdate};
use armada_core::{BattleError, Result};
use armada_sim::BattleSimulator;

use crate::battle::Battle;
use crate::bus::EventBus;

/// Payload of a `start` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct StartBattle {
    pub battle_id: String,
    pub system_id: u64,
    pub units: Vec<BattleUnit>,
    /// RNG seed for the cooldown stagger. Absent, one is derived from
    /// the battle id so identical requests stay reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Registry and tick driver for every live battle.
#[derive(Default)]
pub struct BattleManager {
    battles: HashMap<String, Battle>,
    bus: EventBus,
}

impl BattleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one system's broadcast events.
    pub fn subscribe(&mut self, system_id: u64) -> Receiver<Arc<BattleEvent>> {
        self.bus.subscribe(system_id)
    }

    /// Start a new battle. An empty unit list is accepted; the battle
    /// simply concludes on its first step.
    pub fn start(&mut self, request: StartBattle, now: f64) -> Result<()> {
        if request.battle_id.is_empty() {
            return Err(BattleError::InvalidPayload("empty battle_id".into()));
        }
        if self.battles.contains_key(&request.battle_id) {
            return Err(BattleError::InvalidPayload(format!(
                "battle {} already exists",
                request.battle_id
            )));
        }

        let seed = request
            .seed
            .unwrap_or_else(|| derive_seed(&request.battle_id));
        let sim = BattleSimulator::new(request.units, seed, now);
        let battle = Battle::new(request.battle_id.clone(), request.system_id, sim, now);

        info!(
            "battle {} started in system {} with {} units",
            battle.battle_id,
            battle.system_id,
            battle.sim.unit_count()
        );

        self.bus.publish(
            request.system_id,
            BattleEvent::Started {
                battle_id: battle.battle_id.clone(),
                system_id: battle.system_id,
                unit_count: battle.sim.unit_count(),
                factions: battle.sim.active_factions(),
            },
        );
        self.battles.insert(request.battle_id, battle);
        Ok(())
    }

    /// Add units to a running battle. Returns how many joined.
    pub fn reinforce(
        &mut self,
        battle_id: &str,
        units: Vec<BattleUnit>,
        now: f64,
    ) -> Result<usize> {
        let battle = self.live_battle(battle_id)?;

        let mut entries = Vec::with_capacity(units.len());
        for unit in units {
            let entry = ReinforcementEntry {
                id: unit.id,
                faction_id: unit.faction_id,
                player_id: unit.player_id,
            };
            if battle.sim.add_unit(unit, now) {
                entries.push(entry);
            }
        }

        let added = entries.len();
        battle.note_reinforcements(added as u32);
        battle.wake();

        let system_id = battle.system_id;
        let event = BattleEvent::Reinforcements {
            battle_id: battle_id.to_string(),
            system_id,
            reinforcements: entries,
        };
        self.bus.publish(system_id, event);
        info!("battle {battle_id}: {added} reinforcements");
        Ok(added)
    }

    /// Overwrite positions for listed units. Returns the update count.
    pub fn update_positions(
        &mut self,
        battle_id: &str,
        updates: &[PositionUpdate],
    ) -> Result<usize> {
        let battle = self.live_battle(battle_id)?;
        let updated = battle.sim.update_positions(updates);
        battle.wake();
        Ok(updated)
    }

    /// Overwrite one unit's position. Returns whether the unit existed.
    pub fn update_position(&mut self, battle_id: &str, update: &PositionUpdate) -> Result<bool> {
        let battle = self.live_battle(battle_id)?;
        let found = battle.sim.update_single_position(
            update.id,
            update.x,
            update.y,
            update.z,
            update.clear_target,
        );
        battle.wake();
        Ok(found)
    }

    /// Clear every unit's target in a battle. Returns targets dropped.
    pub fn force_retarget(&mut self, battle_id: &str) -> Result<u32> {
        let battle = self.live_battle(battle_id)?;
        let cleared = battle.sim.force_retarget_all();
        battle.wake();
        Ok(cleared)
    }

    /// Status of one battle, ended-but-retained battles included.
    pub fn status(&self, battle_id: &str, now: f64) -> Result<BattleStatus> {
        self.battles
            .get(battle_id)
            .map(|b| b.status(now))
            .ok_or_else(|| BattleError::BattleNotFound(battle_id.to_string()))
    }

    /// Summaries of all battles that have not ended, sorted by id.
    pub fn active_battles(&self, now: f64) -> Vec<BattleSummary> {
        let mut summaries: Vec<BattleSummary> = self
            .battles
            .values()
            .filter(|b| !b.ended())
            .map(|b| b.summary(now))
            .collect();
        summaries.sort_by(|a, b| a.battle_id.cmp(&b.battle_id));
        summaries
    }

    /// Stop a battle explicitly. Stopping one that already ended is a
    /// no-op (it stays queryable until retention lapses).
    pub fn stop(&mut self, battle_id: &str, now: f64) -> Result<()> {
        let battle = self
            .battles
            .get_mut(battle_id)
            .ok_or_else(|| BattleError::BattleNotFound(battle_id.to_string()))?;

        let system_id = battle.system_id;
        if let Some(event) = battle.finalize("stopped", now) {
            info!("battle {battle_id} stopped");
            self.bus.publish(system_id, event);
        }
        Ok(())
    }

    /// End every live battle with the shutdown reason.
    pub fn shutdown(&mut self, now: f64) {
        let mut events = Vec::new();
        for battle in self.battles.values_mut() {
            let system_id = battle.system_id;
            if let Some(event) = battle.finalize("server_shutdown", now) {
                events.push((system_id, event));
            }
        }
        for (system_id, event) in events {
            self.bus.publish(system_id, event);
        }
        info!("manager shut down; {} battles ended", self.battles.len());
    }

    /// One scheduler firing: purge expired wrecks, enforce timeouts,
    /// step every battle that is due, publish what happened.
    pub fn tick_all(&mut self, now: f64) {
        self.battles.retain(|id, battle| {
            let purge = battle.purge_due(now);
            if purge {
                info!("battle {id} purged after retention");
            }
            !purge
        });

        for battle in self.battles.values_mut() {
            if battle.ended() {
                continue;
            }

            // Timeouts run on wall time, idle or not: an idle battle
            // must still stalemate out.
            if let Some(reason) = battle.timed_out(now) {
                warn!("battle {} timed out: {reason}", battle.battle_id);
                if let Some(event) = battle.finalize(&reason, now) {
                    self.bus.publish(battle.system_id, event);
                }
                continue;
            }

            if !battle.should_step(now) {
                continue;
            }

            let dt = (now - battle.last_tick_time).max(0.0) as f32;
            battle.last_tick_time = now;

            // A panicking step ends that battle, never the scheduler.
            let step = catch_unwind(AssertUnwindSafe(|| battle.sim.step(dt, now)));
            let delta = match step {
                Ok(delta) => delta,
                Err(_) => {
                    error!("battle {} step panicked", battle.battle_id);
                    if let Some(event) = battle.finalize("step_failure", now) {
                        self.bus.publish(battle.system_id, event);
                    }
                    continue;
                }
            };

            battle.absorb(&delta, now);

            self.bus.publish(
                battle.system_id,
                BattleEvent::Tick {
                    battle_id: battle.battle_id.clone(),
                    system_id: battle.system_id,
                    tick: delta.tick,
                    moved: delta.moved,
                    damaged: delta.damaged,
                    destroyed: delta.destroyed,
                    weapons_fired: delta.weapons_fired,
                },
            );

            if battle.sim.is_battle_ended() {
                if let Some(event) = battle.finalize("elimination", now) {
                    info!("battle {} concluded", battle.battle_id);
                    self.bus.publish(battle.system_id, event);
                }
            }
        }
    }

    pub fn battle_count(&self) -> usize {
        self.battles.len()
    }

    fn live_battle(&mut self, battle_id: &str) -> Result<&mut Battle> {
        let battle = self
            .battles
            .get_mut(battle_id)
            .ok_or_else(|| BattleError::BattleNotFound(battle_id.to_string()))?;
        if battle.ended() {
            return Err(BattleError::BattleEnded(battle_id.to_string()));
        }
        Ok(battle)
    }
}

/// FNV-1a over the battle id: a stable default seed when the caller
/// does not supply one.
fn derive_seed(battle_id: &str) -> u64 {
    battle_id.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
