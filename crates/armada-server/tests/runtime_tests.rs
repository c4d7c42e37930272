//! Smoke tests against the live scheduler thread.

use std::time::{Duration, Instant};

use armada_core::events::BattleEvent;
use armada_core::unit::{BattleUnit, Weapon};
use armada_server::{spawn_runtime, StartBattle};

fn duelist(id: u32, faction: u32, x: f32) -> BattleUnit {
    BattleUnit {
        id,
        faction_id: faction,
        max_hp: 10.0,
        hp: 10.0,
        pos_x: x,
        weapons: vec![Weapon {
            tag: "laser".into(),
            dps: 20.0,
            fire_rate: 1.0,
            cooldown: 1.0,
            max_range: 100.0,
            optimal_range: 50.0,
            target_armor_max: 0.0,
            last_fired: 0.0,
        }],
        ..Default::default()
    }
}

#[test]
fn battle_runs_to_conclusion_on_the_scheduler() {
    let (handle, join) = spawn_runtime();
    let events = handle.subscribe(3).unwrap();

    // Lopsided hulls so the winner is fixed regardless of which
    // staggered volley lands first.
    let mut tank = duelist(1, 1, 0.0);
    tank.hp = 1000.0;
    tank.max_hp = 1000.0;
    handle
        .start(StartBattle {
            battle_id: "live".into(),
            system_id: 3,
            units: vec![tank, duelist(2, 2, 10.0)],
            seed: Some(99),
        })
        .unwrap();

    // One 20-damage hit kills either duelist; the staggered opening
    // volley lands within the first cooldown interval.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let status = handle.status("live").unwrap();
        if status.ended {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "battle should conclude within 5s"
        );
        std::thread::sleep(Duration::from_millis(20));
    }

    let status = handle.status("live").unwrap();
    let results = status.results.unwrap();
    assert_eq!(results.reason, "elimination");
    assert_eq!(results.victor, Some(1));
    assert_eq!(results.casualties, vec![2]);

    let mut saw_started = false;
    let mut saw_tick = false;
    let mut saw_concluded = false;
    while let Ok(event) = events.try_recv() {
        match event.as_ref() {
            BattleEvent::Started { .. } => saw_started = true,
            BattleEvent::Tick { .. } => saw_tick = true,
            BattleEvent::Concluded { .. } => saw_concluded = true,
            _ => {}
        }
    }
    assert!(saw_started && saw_tick && saw_concluded);

    handle.shutdown().unwrap();
    join.join().unwrap();
}

#[test]
fn shutdown_concludes_live_battles_with_reason() {
    let (handle, join) = spawn_runtime();
    let events = handle.subscribe(4).unwrap();

    // Out of range: the battle idles immediately and would run for
    // minutes without intervention.
    let mut far = duelist(2, 2, 5000.0);
    far.hp = 100.0;
    far.max_hp = 100.0;
    handle
        .start(StartBattle {
            battle_id: "parked".into(),
            system_id: 4,
            units: vec![duelist(1, 1, 0.0), far],
            seed: None,
        })
        .unwrap();

    handle.shutdown().unwrap();
    join.join().unwrap();

    let mut reason = None;
    while let Ok(event) = events.try_recv() {
        if let BattleEvent::Concluded { reason: r, .. } = event.as_ref() {
            reason = Some(r.clone());
        }
    }
    assert_eq!(reason.as_deref(), Some("server_shutdown"));

    // The scheduler is gone; further calls fail cleanly.
    assert!(handle.status("parked").is_err());
}
