//! Manager lifecycle tests, driven through a synthetic wall clock.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use armada_core::events::BattleEvent;
use armada_core::unit::{BattleUnit, PositionUpdate, Weapon};
use armada_core::BattleError;
use armada_server::{BattleManager, StartBattle};

const DT: f64 = 0.05;

fn laser(max_range: f32, optimal: f32) -> Weapon {
    Weapon {
        tag: "laser".into(),
        dps: 10.0,
        fire_rate: 1.0,
        cooldown: 1.0,
        max_range,
        optimal_range: optimal,
        target_armor_max: 0.0,
        last_fired: -1.0,
    }
}

fn fighter(id: u32, faction: u32, hp: f32, x: f32, weapons: Vec<Weapon>) -> BattleUnit {
    BattleUnit {
        id,
        faction_id: faction,
        max_hp: hp,
        hp,
        pos_x: x,
        weapons,
        ..Default::default()
    }
}

fn start_request(battle_id: &str, units: Vec<BattleUnit>) -> StartBattle {
    StartBattle {
        battle_id: battle_id.into(),
        system_id: 7,
        units,
        seed: Some(42),
    }
}

fn drain(rx: &Receiver<Arc<BattleEvent>>) -> Vec<Arc<BattleEvent>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn concluded_reason(events: &[Arc<BattleEvent>]) -> Option<String> {
    events.iter().find_map(|e| match e.as_ref() {
        BattleEvent::Concluded { reason, .. } => Some(reason.clone()),
        _ => None,
    })
}

// ---- Lifecycle ----

#[test]
fn start_publishes_and_status_reports() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    let units = vec![
        fighter(1, 1, 100.0, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 2, 100.0, 10.0, vec![laser(100.0, 50.0)]),
    ];
    manager.start(start_request("b1", units), 0.0).unwrap();

    let events = drain(&rx);
    assert!(matches!(
        events[0].as_ref(),
        BattleEvent::Started {
            unit_count: 2,
            ..
        }
    ));

    let status = manager.status("b1", 0.0).unwrap();
    assert_eq!(status.tick, 0);
    assert!(!status.ended);
    assert_eq!(status.factions, vec![1, 2]);
    assert_eq!(status.unit_count, 2);

    assert_eq!(manager.active_battles(0.0).len(), 1);
}

#[test]
fn duplicate_battle_id_is_rejected() {
    let mut manager = BattleManager::new();
    manager.start(start_request("b1", Vec::new()), 0.0).unwrap();
    let err = manager.start(start_request("b1", Vec::new()), 0.0);
    assert!(matches!(err, Err(BattleError::InvalidPayload(_))));
}

#[test]
fn operations_on_unknown_battle_fail() {
    let mut manager = BattleManager::new();
    assert!(matches!(
        manager.status("ghost", 0.0),
        Err(BattleError::BattleNotFound(_))
    ));
    assert!(matches!(
        manager.stop("ghost", 0.0),
        Err(BattleError::BattleNotFound(_))
    ));
    assert!(matches!(
        manager.reinforce("ghost", Vec::new(), 0.0),
        Err(BattleError::BattleNotFound(_))
    ));
    assert!(matches!(
        manager.force_retarget("ghost"),
        Err(BattleError::BattleNotFound(_))
    ));
}

#[test]
fn battle_plays_to_elimination() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    let units = vec![
        fighter(1, 1, 200.0, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 2, 30.0, 10.0, vec![laser(100.0, 50.0)]),
    ];
    manager.start(start_request("b1", units), 0.0).unwrap();

    let mut now = 0.0;
    for _ in 0..200 {
        now += DT;
        manager.tick_all(now);
        if manager.status("b1", now).unwrap().ended {
            break;
        }
    }

    let status = manager.status("b1", now).unwrap();
    assert!(status.ended);
    let results = status.results.expect("outcome retained after end");
    assert_eq!(results.victor, Some(1));
    assert_eq!(results.reason, "elimination");
    assert_eq!(results.casualties, vec![2]);
    assert!(results.survivors.contains(&1));
    assert!(status.stats.units_destroyed == 1);
    assert!(status.stats.weapons_fired > 0);

    let events = drain(&rx);
    assert_eq!(concluded_reason(&events).as_deref(), Some("elimination"));

    // Ended battles fall out of the active listing but stay queryable.
    assert!(manager.active_battles(now).is_empty());

    // Stopping an already-ended battle is a quiet no-op.
    manager.stop("b1", now).unwrap();
    assert!(concluded_reason(&drain(&rx)).is_none());

    // Mutations are refused.
    assert!(matches!(
        manager.reinforce("b1", Vec::new(), now),
        Err(BattleError::BattleEnded(_))
    ));
}

#[test]
fn single_faction_concludes_on_first_tick() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    let units = vec![
        fighter(1, 1, 100.0, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 1, 100.0, 10.0, vec![]),
    ];
    manager.start(start_request("solo", units), 0.0).unwrap();
    manager.tick_all(DT);

    let status = manager.status("solo", DT).unwrap();
    assert!(status.ended);
    assert_eq!(status.tick, 1, "no further ticks after the first");
    assert_eq!(status.results.unwrap().victor, Some(1));

    let events = drain(&rx);
    assert!(matches!(events[0].as_ref(), BattleEvent::Started { .. }));
    assert!(concluded_reason(&events).is_some());
}

#[test]
fn empty_battle_concludes_immediately_with_no_victor() {
    let mut manager = BattleManager::new();
    manager.start(start_request("empty", Vec::new()), 0.0).unwrap();
    manager.tick_all(DT);

    let status = manager.status("empty", DT).unwrap();
    assert!(status.ended);
    assert_eq!(status.results.unwrap().victor, None);
}

// ---- Idle mode ----

#[test]
fn quiet_battle_goes_idle_and_stops_ticking() {
    let mut manager = BattleManager::new();

    // Armed, ready, but far out of mutual range: nothing can happen.
    let units = vec![
        fighter(1, 1, 100.0, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 2, 100.0, 1000.0, vec![laser(100.0, 50.0)]),
    ];
    manager.start(start_request("calm", units), 0.0).unwrap();

    manager.tick_all(DT);
    let status = manager.status("calm", DT).unwrap();
    assert!(status.is_idle);
    assert_eq!(status.tick, 1);

    // Subsequent firings inside the idle re-check window do nothing.
    for i in 2..8 {
        manager.tick_all(i as f64 * DT);
    }
    assert_eq!(manager.status("calm", 0.4).unwrap().tick, 1);
}

#[test]
fn position_update_wakes_idle_battle_and_weapons_fire() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    let units = vec![
        fighter(1, 1, 100.0, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 2, 100.0, 1000.0, vec![laser(100.0, 50.0)]),
    ];
    manager.start(start_request("wake", units), 0.0).unwrap();
    manager.tick_all(DT);
    assert!(manager.status("wake", DT).unwrap().is_idle);
    drain(&rx);

    // 200 ms later an external move puts them in range.
    let moved = manager
        .update_position(
            "wake",
            &PositionUpdate {
                id: 2,
                x: 50.0,
                y: 0.0,
                z: 0.0,
                clear_target: false,
            },
        )
        .unwrap();
    assert!(moved);
    assert!(!manager.status("wake", 0.25).unwrap().is_idle);

    // The very next firing steps the battle and shots go out.
    manager.tick_all(0.3);
    let fired = drain(&rx).iter().any(|e| match e.as_ref() {
        BattleEvent::Tick { weapons_fired, .. } => !weapons_fired.is_empty(),
        _ => false,
    });
    assert!(fired, "wake tick must produce weapon fire");
}

#[test]
fn reinforcements_wake_idle_battles_and_publish() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    let units = vec![
        fighter(1, 1, 100.0, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 2, 100.0, 1000.0, vec![laser(100.0, 50.0)]),
    ];
    manager.start(start_request("rf", units), 0.0).unwrap();
    manager.tick_all(DT);
    assert!(manager.status("rf", DT).unwrap().is_idle);
    drain(&rx);

    let added = manager
        .reinforce(
            "rf",
            vec![fighter(3, 2, 100.0, 40.0, vec![laser(100.0, 50.0)])],
            0.2,
        )
        .unwrap();
    assert_eq!(added, 1);

    let events = drain(&rx);
    assert!(matches!(
        events[0].as_ref(),
        BattleEvent::Reinforcements { reinforcements, .. } if reinforcements.len() == 1
    ));

    let status = manager.status("rf", 0.2).unwrap();
    assert!(!status.is_idle);
    assert_eq!(status.unit_count, 3);
    assert_eq!(status.stats.reinforcements, 1);
}

// ---- Timeouts ----

#[test]
fn stalemate_times_out_after_five_quiet_minutes() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    // Mutually impenetrable: no damage will ever occur.
    let mut a = fighter(1, 1, 100.0, 0.0, vec![laser(100.0, 50.0)]);
    a.armor = 10.0;
    let mut b = fighter(2, 2, 100.0, 10.0, vec![laser(100.0, 50.0)]);
    b.armor = 10.0;

    manager.start(start_request("stale", vec![a, b]), 0.0).unwrap();
    manager.tick_all(DT);
    assert!(manager.status("stale", DT).unwrap().is_idle);

    // Under the window: still alive.
    manager.tick_all(200.0);
    assert!(!manager.status("stale", 200.0).unwrap().ended);

    // Past it: concluded with no victor, idle or not.
    manager.tick_all(301.0);
    let status = manager.status("stale", 301.0).unwrap();
    assert!(status.ended);
    let results = status.results.unwrap();
    assert_eq!(results.victor, None);
    assert_eq!(results.reason, "stalemate_no_damage_5m");

    assert_eq!(
        concluded_reason(&drain(&rx)).as_deref(),
        Some("stalemate_no_damage_5m")
    );
}

#[test]
fn max_duration_ends_even_active_battles() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    // Effectively immortal, constantly trading damage: stalemate
    // never arms, so only the absolute ceiling can end this.
    let units = vec![
        fighter(1, 1, 1.0e6, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 2, 1.0e6, 10.0, vec![laser(100.0, 50.0)]),
    ];
    manager.start(start_request("marathon", units), 0.0).unwrap();

    let mut now = 0.0;
    let mut ended_at = None;
    while now < 1900.0 {
        now += 10.0;
        manager.tick_all(now);
        if manager.status("marathon", now).unwrap().ended {
            ended_at = Some(now);
            break;
        }
    }

    let ended_at = ended_at.expect("ceiling must have fired");
    assert!(ended_at > 1800.0, "ended only after the 30 minute mark");

    let results = manager.status("marathon", now).unwrap().results.unwrap();
    assert_eq!(results.reason, "max_duration_exceeded_30m");
    assert_eq!(results.victor, None);
    assert_eq!(
        concluded_reason(&drain(&rx)).as_deref(),
        Some("max_duration_exceeded_30m")
    );
}

// ---- Retention and shutdown ----

#[test]
fn ended_battles_purge_after_retention() {
    let mut manager = BattleManager::new();
    manager.start(start_request("tmp", Vec::new()), 0.0).unwrap();
    manager.tick_all(DT);
    assert!(manager.status("tmp", DT).unwrap().ended);

    // Within retention the outcome is still queryable.
    manager.tick_all(30.0);
    assert!(manager.status("tmp", 30.0).is_ok());

    // After it, the battle is gone.
    manager.tick_all(DT + 61.0);
    assert!(matches!(
        manager.status("tmp", DT + 61.0),
        Err(BattleError::BattleNotFound(_))
    ));
    assert_eq!(manager.battle_count(), 0);
}

#[test]
fn shutdown_concludes_every_live_battle() {
    let mut manager = BattleManager::new();
    let rx = manager.subscribe(7);

    let units = vec![
        fighter(1, 1, 100.0, 0.0, vec![laser(100.0, 50.0)]),
        fighter(2, 2, 100.0, 1000.0, vec![laser(100.0, 50.0)]),
    ];
    manager.start(start_request("s1", units.clone()), 0.0).unwrap();
    manager
        .start(
            StartBattle {
                battle_id: "s2".into(),
                system_id: 7,
                units,
                seed: Some(43),
            },
            0.0,
        )
        .unwrap();

    manager.shutdown(1.0);

    let reasons: Vec<String> = drain(&rx)
        .iter()
        .filter_map(|e| match e.as_ref() {
            BattleEvent::Concluded { reason, .. } => Some(reason.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(reasons, vec!["server_shutdown", "server_shutdown"]);

    // Shutdown is idempotent: nothing concludes twice.
    manager.shutdown(2.0);
    assert!(drain(&rx).is_empty());
}

#[test]
fn update_position_reports_unknown_units() {
    let mut manager = BattleManager::new();
    manager
        .start(
            start_request("b", vec![fighter(1, 1, 100.0, 0.0, vec![])]),
            0.0,
        )
        .unwrap();

    let found = manager
        .update_position(
            "b",
            &PositionUpdate {
                id: 99,
                x: 0.0,
                y: 0.0,
                z: 0.0,
                clear_target: false,
            },
        )
        .unwrap();
    assert!(!found);
}
