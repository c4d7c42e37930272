//! Headless battle server.
//!
//! Control operations arrive as JSON lines on stdin; replies and
//! subscribed broadcast events go to stdout as JSON lines. The real
//! deployment wires the same [`ServerHandle`] into the game's event
//! bus — this binary is the development and soak-test harness.
//!
//! ```text
//! {"op":"start","battle_id":"b1","system_id":7,"units":[...]}
//! {"op":"subscribe","system_id":7}
//! {"op":"status","battle_id":"b1"}
//! {"op":"stop","battle_id":"b1"}
//! ```

use std::io::{self, BufRead};
use std::thread;

use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use armada_core::unit::{BattleUnit, PositionUpdate};
use armada_core::BattleError;
use armada_server::{spawn_runtime, ServerHandle, StartBattle};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ControlOp {
    Start {
        battle_id: String,
        system_id: u64,
        units: Vec<BattleUnit>,
        #[serde(default)]
        seed: Option<u64>,
    },
    Reinforcements {
        battle_id: String,
        units: Vec<BattleUnit>,
    },
    UpdatePositions {
        battle_id: String,
        positions: Vec<PositionUpdate>,
    },
    UpdatePosition {
        battle_id: String,
        id: u32,
        x: f32,
        y: f32,
        z: f32,
        #[serde(default)]
        clear_target: bool,
    },
    ForceRetarget {
        battle_id: String,
    },
    Status {
        battle_id: String,
    },
    ActiveBattles,
    Stop {
        battle_id: String,
    },
    Subscribe {
        system_id: u64,
    },
    Shutdown,
}

fn main() {
    env_logger::init();

    let (handle, join) = spawn_runtime();
    info!("armada server ready; reading control ops from stdin");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("stdin read error: {err}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let op = match serde_json::from_str::<ControlOp>(trimmed) {
            Ok(op) => op,
            Err(err) => {
                println!("{}", json!({ "success": false, "error": format!("invalid payload: {err}") }));
                continue;
            }
        };

        let shutdown = matches!(op, ControlOp::Shutdown);
        println!("{}", execute(&handle, op));
        if shutdown {
            break;
        }
    }

    // EOF or shutdown: end every battle and stop the scheduler.
    let _ = handle.shutdown();
    let _ = join.join();
}

fn execute(handle: &ServerHandle, op: ControlOp) -> Value {
    match op {
        ControlOp::Start {
            battle_id,
            system_id,
            units,
            seed,
        } => {
            let id = battle_id.clone();
            reply(
                handle
                    .start(StartBattle {
                        battle_id,
                        system_id,
                        units,
                        seed,
                    })
                    .map(|_| json!({ "success": true, "battle_id": id })),
            )
        }
        ControlOp::Reinforcements { battle_id, units } => reply(
            handle
                .reinforce(&battle_id, units)
                .map(|added| json!({ "success": true, "added": added })),
        ),
        ControlOp::UpdatePositions {
            battle_id,
            positions,
        } => reply(
            handle
                .update_positions(&battle_id, positions)
                .map(|updated| json!({ "success": true, "updated_count": updated })),
        ),
        ControlOp::UpdatePosition {
            battle_id,
            id,
            x,
            y,
            z,
            clear_target,
        } => reply(
            handle
                .update_position(
                    &battle_id,
                    PositionUpdate {
                        id,
                        x,
                        y,
                        z,
                        clear_target,
                    },
                )
                .map(|found| json!({ "success": found })),
        ),
        ControlOp::ForceRetarget { battle_id } => reply(
            handle
                .force_retarget(&battle_id)
                .map(|cleared| json!({ "success": true, "cleared": cleared })),
        ),
        ControlOp::Status { battle_id } => match handle.status(&battle_id) {
            Ok(status) => {
                let mut value = serde_json::to_value(status).unwrap_or_default();
                if let Value::Object(map) = &mut value {
                    map.insert("found".into(), Value::Bool(true));
                }
                value
            }
            Err(BattleError::BattleNotFound(_)) => json!({ "found": false }),
            Err(err) => json!({ "found": false, "error": err.to_string() }),
        },
        ControlOp::ActiveBattles => reply(
            handle
                .active_battles()
                .map(|battles| json!({ "battles": battles })),
        ),
        ControlOp::Stop { battle_id } => {
            reply(handle.stop(&battle_id).map(|_| json!({ "success": true })))
        }
        ControlOp::Subscribe { system_id } => match handle.subscribe(system_id) {
            Ok(events) => {
                thread::spawn(move || {
                    for event in events.iter() {
                        match serde_json::to_string(event.as_ref()) {
                            Ok(line) => println!("{line}"),
                            Err(err) => warn!("event serialization failed: {err}"),
                        }
                    }
                });
                json!({ "success": true, "system_id": system_id })
            }
            Err(err) => json!({ "success": false, "error": err.to_string() }),
        },
        ControlOp::Shutdown => {
            reply(handle.shutdown().map(|_| json!({ "success": true })))
        }
    }
}

fn reply(result: armada_core::Result<Value>) -> Value {
    result.unwrap_or_else(|err| json!({ "success": false, "error": err.to_string() }))
}
