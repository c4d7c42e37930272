//! Scheduler thread and the handle used to reach it.
//!
//! The manager lives on a dedicated thread that fires every 50 ms:
//! drain pending control operations, sweep all battles, sleep to the
//! next deadline. Operations carry their own reply channel, so they
//! take effect strictly between ticks and never interleave a step.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::info;

use armada_core::constants::TICK_INTERVAL_MS;
use armada_core::events::BattleEvent;
use armada_core::state::{BattleStatus, BattleSummary};
use armada_core::unit::{BattleUnit, PositionUpdate};
use armada_core::{BattleError, Result};

use crate::manager::{BattleManager, StartBattle};

/// Pending control operations between the handle and the scheduler.
const REQUEST_CAPACITY: usize = 64;

enum Request {
    Start {
        request: StartBattle,
        reply: Sender<Result<()>>,
    },
    Reinforce {
        battle_id: String,
        units: Vec<BattleUnit>,
        reply: Sender<Result<usize>>,
    },
    UpdatePositions {
        battle_id: String,
        updates: Vec<PositionUpdate>,
        reply: Sender<Result<usize>>,
    },
    UpdatePosition {
        battle_id: String,
        update: PositionUpdate,
        reply: Sender<Result<bool>>,
    },
    ForceRetarget {
        battle_id: String,
        reply: Sender<Result<u32>>,
    },
    Status {
        battle_id: String,
        reply: Sender<Result<BattleStatus>>,
    },
    ActiveBattles {
        reply: Sender<Vec<BattleSummary>>,
    },
    Stop {
        battle_id: String,
        reply: Sender<Result<()>>,
    },
    Subscribe {
        system_id: u64,
        reply: Sender<Receiver<Arc<BattleEvent>>>,
    },
    Shutdown {
        reply: Sender<()>,
    },
}

/// Cloneable handle to the scheduler thread. Every method blocks for
/// its reply, which arrives within one tick period.
#[derive(Clone)]
pub struct ServerHandle {
    tx: Sender<Request>,
}

impl ServerHandle {
    pub fn start(&self, request: StartBattle) -> Result<()> {
        let (reply, rx) = bounded(1);
        self.send(Request::Start { request, reply })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)?
    }

    pub fn reinforce(&self, battle_id: &str, units: Vec<BattleUnit>) -> Result<usize> {
        let (reply, rx) = bounded(1);
        self.send(Request::Reinforce {
            battle_id: battle_id.to_string(),
            units,
            reply,
        })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)?
    }

    pub fn update_positions(&self, battle_id: &str, updates: Vec<PositionUpdate>) -> Result<usize> {
        let (reply, rx) = bounded(1);
        self.send(Request::UpdatePositions {
            battle_id: battle_id.to_string(),
            updates,
            reply,
        })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)?
    }

    pub fn update_position(&self, battle_id: &str, update: PositionUpdate) -> Result<bool> {
        let (reply, rx) = bounded(1);
        self.send(Request::UpdatePosition {
            battle_id: battle_id.to_string(),
            update,
            reply,
        })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)?
    }

    pub fn force_retarget(&self, battle_id: &str) -> Result<u32> {
        let (reply, rx) = bounded(1);
        self.send(Request::ForceRetarget {
            battle_id: battle_id.to_string(),
            reply,
        })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)?
    }

    pub fn status(&self, battle_id: &str) -> Result<BattleStatus> {
        let (reply, rx) = bounded(1);
        self.send(Request::Status {
            battle_id: battle_id.to_string(),
            reply,
        })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)?
    }

    pub fn active_battles(&self) -> Result<Vec<BattleSummary>> {
        let (reply, rx) = bounded(1);
        self.send(Request::ActiveBattles { reply })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)
    }

    pub fn stop(&self, battle_id: &str) -> Result<()> {
        let (reply, rx) = bounded(1);
        self.send(Request::Stop {
            battle_id: battle_id.to_string(),
            reply,
        })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)?
    }

    /// Subscribe to broadcast events for one system.
    pub fn subscribe(&self, system_id: u64) -> Result<Receiver<Arc<BattleEvent>>> {
        let (reply, rx) = bounded(1);
        self.send(Request::Subscribe { system_id, reply })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)
    }

    /// End every battle with `server_shutdown` and stop the scheduler.
    pub fn shutdown(&self) -> Result<()> {
        let (reply, rx) = bounded(1);
        self.send(Request::Shutdown { reply })?;
        rx.recv().map_err(|_| BattleError::ShuttingDown)
    }

    fn send(&self, request: Request) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| BattleError::ShuttingDown)
    }
}

/// Spawn the scheduler thread and hand back its control handle.
pub fn spawn_runtime() -> (ServerHandle, JoinHandle<()>) {
    let (tx, rx) = bounded::<Request>(REQUEST_CAPACITY);

    let join = thread::Builder::new()
        .name("armada-scheduler".into())
        .spawn(move || run_scheduler(rx))
        .expect("failed to spawn scheduler thread");

    (ServerHandle { tx }, join)
}

/// The scheduler loop. Runs until Shutdown or every handle is gone.
fn run_scheduler(rx: Receiver<Request>) {
    let epoch = Instant::now();
    let tick_interval = Duration::from_millis(TICK_INTERVAL_MS);
    let mut manager = BattleManager::new();
    let mut next_tick = Instant::now();

    info!("scheduler running at {} ms per tick", TICK_INTERVAL_MS);

    loop {
        // 1. Drain pending control operations.
        loop {
            let now = epoch.elapsed().as_secs_f64();
            match rx.try_recv() {
                Ok(request) => {
                    if handle_request(&mut manager, request, now) {
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    manager.shutdown(now);
                    return;
                }
            }
        }

        // 2. Sweep all battles.
        manager.tick_all(epoch.elapsed().as_secs_f64());

        // 3. Sleep to the next absolute deadline; if we fell far
        // behind, reset instead of spiralling to catch up.
        next_tick += tick_interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else if now - next_tick > tick_interval * 2 {
            next_tick = now;
        }
    }
}

/// Execute one request. Returns true when the scheduler should exit.
fn handle_request(manager: &mut BattleManager, request: Request, now: f64) -> bool {
    match request {
        Request::Start { request, reply } => {
            let _ = reply.send(manager.start(request, now));
        }
        Request::Reinforce {
            battle_id,
            units,
            reply,
        } => {
            let _ = reply.send(manager.reinforce(&battle_id, units, now));
        }
        Request::UpdatePositions {
            battle_id,
            updates,
            reply,
        } => {
            let _ = reply.send(manager.update_positions(&battle_id, &updates));
        }
        Request::UpdatePosition {
            battle_id,
            update,
            reply,
        } => {
            let _ = reply.send(manager.update_position(&battle_id, &update));
        }
        Request::ForceRetarget { battle_id, reply } => {
            let _ = reply.send(manager.force_retarget(&battle_id));
        }
        Request::Status { battle_id, reply } => {
            let _ = reply.send(manager.status(&battle_id, now));
        }
        Request::ActiveBattles { reply } => {
            let _ = reply.send(manager.active_battles(now));
        }
        Request::Stop { battle_id, reply } => {
            let _ = reply.send(manager.stop(&battle_id, now));
        }
        Request::Subscribe { system_id, reply } => {
            let _ = reply.send(manager.subscribe(system_id));
        }
        Request::Shutdown { reply } => {
            manager.shutdown(now);
            let _ = reply.send(());
            return true;
        }
    }
    false
}
