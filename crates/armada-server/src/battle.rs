//! Per-battle bookkeeping around a simulator: wall-clock timing, idle
//! tracking, timeout enforcement, and finalization.
//!
//! All times here are seconds on the manager's monotonic clock. Idle
//! skipping can suspend ticking for arbitrary stretches, so duration
//! and timeout decisions compare wall instants, never tick counts.

use log::debug;

use armada_core::constants::{
    IDLE_CHECK_INTERVAL_SECS, MAX_BATTLE_DURATION_SECS, RETENTION_SECS, STALEMATE_WINDOW_SECS,
    TIMEOUT_CHECK_INTERVAL_SECS,
};
use armada_core::delta::TickDelta;
use armada_core::events::BattleEvent;
use armada_core::state::{BattleOutcome, BattleStats, BattleStatus, BattleSummary};
use armada_sim::BattleSimulator;

/// One live (or recently ended) battle.
pub struct Battle {
    pub battle_id: String,
    pub system_id: u64,
    pub sim: BattleSimulator,
    /// Wall instant the battle started.
    start_time: f64,
    /// Wall instant of the last executed step; the next step's `dt`
    /// is measured from here.
    pub last_tick_time: f64,
    /// Wall instant damage or a destruction last occurred.
    last_damage_time: f64,
    last_timeout_check: f64,
    idle: bool,
    last_idle_check: f64,
    /// Wake-up instant recorded when the battle went idle.
    next_weapon_ready: Option<f64>,
    weapons_fired: u64,
    units_destroyed: u32,
    reinforcements: u32,
    outcome: Option<BattleOutcome>,
    ended_at: f64,
}

impl Battle {
    pub fn new(battle_id: String, system_id: u64, sim: BattleSimulator, now: f64) -> Self {
        Self {
            battle_id,
            system_id,
            sim,
            start_time: now,
            last_tick_time: now,
            last_damage_time: now,
            last_timeout_check: now,
            idle: false,
            last_idle_check: now,
            next_weapon_ready: None,
            weapons_fired: 0,
            units_destroyed: 0,
            reinforcements: 0,
            outcome: None,
            ended_at: 0.0,
        }
    }

    pub fn ended(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn duration_ms(&self, now: f64) -> u64 {
        let end = if self.ended() { self.ended_at } else { now };
        ((end - self.start_time).max(0.0) * 1000.0) as u64
    }

    /// External mutations force the battle back into active ticking.
    pub fn wake(&mut self) {
        self.idle = false;
    }

    pub fn note_reinforcements(&mut self, count: u32) {
        self.reinforcements += count;
    }

    /// Whether the scheduler should run a step right now.
    ///
    /// Active battles step every firing. Idle battles are re-examined
    /// only twice a second, and resume once the recorded weapon-ready
    /// instant arrives; with nothing recorded, only an external
    /// mutation (or a timeout) ends the sleep.
    pub fn should_step(&mut self, now: f64) -> bool {
        if self.ended() {
            return false;
        }
        if !self.idle {
            return true;
        }
        if now - self.last_idle_check < IDLE_CHECK_INTERVAL_SECS {
            return false;
        }
        self.last_idle_check = now;

        match self.next_weapon_ready {
            Some(ready) if now >= ready => {
                debug!("battle {} waking for weapon-ready", self.battle_id);
                self.idle = false;
                true
            }
            _ => false,
        }
    }

    /// Merge one step's delta into the battle's running state.
    pub fn absorb(&mut self, delta: &TickDelta, now: f64) {
        self.weapons_fired += delta.weapons_fired.len() as u64;
        self.units_destroyed += delta.destroyed.len() as u32;

        if !delta.damaged.is_empty() || !delta.destroyed.is_empty() {
            self.last_damage_time = now;
        }

        if delta.is_idle && !self.idle {
            self.idle = true;
            self.last_idle_check = now;
            self.next_weapon_ready = self.sim.next_weapon_ready_time(now);
            debug!(
                "battle {} idle until {:?}",
                self.battle_id, self.next_weapon_ready
            );
        }
    }

    /// Evaluate wall-clock timeouts. Runs at most once per check
    /// interval; returns the termination reason when one tripped.
    pub fn timed_out(&mut self, now: f64) -> Option<String> {
        if now - self.last_timeout_check < TIMEOUT_CHECK_INTERVAL_SECS {
            return None;
        }
        self.last_timeout_check = now;

        if now - self.start_time > MAX_BATTLE_DURATION_SECS {
            return Some(format!(
                "max_duration_exceeded_{}m",
                (MAX_BATTLE_DURATION_SECS / 60.0) as u64
            ));
        }
        if now - self.last_damage_time > STALEMATE_WINDOW_SECS {
            return Some(format!(
                "stalemate_no_damage_{}m",
                (STALEMATE_WINDOW_SECS / 60.0) as u64
            ));
        }
        None
    }

    /// Freeze the battle, record its outcome, and hand back the
    /// `Concluded` event to publish. Idempotent: a second call is a
    /// no-op returning None, so double-ends (a timeout racing a
    /// defeat, say) publish nothing twice.
    pub fn finalize(&mut self, reason: &str, now: f64) -> Option<BattleEvent> {
        if self.outcome.is_some() {
            return None;
        }
        self.ended_at = now;

        let units = self.sim.results();
        let survivors = units.iter().filter(|u| u.alive).map(|u| u.id).collect();
        let casualties = units.iter().filter(|u| !u.alive).map(|u| u.id).collect();

        let outcome = BattleOutcome {
            duration_ms: self.duration_ms(now),
            total_ticks: self.sim.tick(),
            survivors,
            casualties,
            victor: self.sim.victor(),
            reason: reason.to_string(),
            units,
        };
        let event = BattleEvent::concluded(&self.battle_id, self.system_id, &outcome);
        self.outcome = Some(outcome);
        Some(event)
    }

    /// Whether the post-end retention window has lapsed.
    pub fn purge_due(&self, now: f64) -> bool {
        self.ended() && now - self.ended_at > RETENTION_SECS
    }

    fn stats(&self) -> BattleStats {
        BattleStats {
            weapons_fired: self.weapons_fired,
            units_destroyed: self.units_destroyed,
            total_damage: self.sim.units().iter().map(|u| u.damage_dealt).sum(),
            reinforcements: self.reinforcements,
        }
    }

    pub fn status(&self, now: f64) -> BattleStatus {
        BattleStatus {
            battle_id: self.battle_id.clone(),
            system_id: self.system_id,
            tick: self.sim.tick(),
            duration_ms: self.duration_ms(now),
            ended: self.ended(),
            unit_count: self.sim.unit_count(),
            factions: self.sim.active_factions(),
            is_idle: self.idle,
            stats: self.stats(),
            results: self.outcome.clone(),
        }
    }

    pub fn summary(&self, now: f64) -> BattleSummary {
        BattleSummary {
            battle_id: self.battle_id.clone(),
            system_id: self.system_id,
            tick: self.sim.tick(),
            duration_ms: self.duration_ms(now),
            unit_count: self.sim.unit_count(),
            factions: self.sim.active_factions(),
            is_idle: self.idle,
        }
    }
}
