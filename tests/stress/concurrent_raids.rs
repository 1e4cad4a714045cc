//! Stress test: concurrent boss attacks must never spend an XP event twice,
//! and a boss can only be defeated (and pay its bonus) once.

use std::sync::Arc;
use std::thread;

use levelup::{Award, Config, Engine, XpKind};

const THREADS: usize = 6;

fn file_engine(dir: &std::path::Path) -> Arc<Engine> {
    let config = Config::for_dir(dir).with_action_secret("22".repeat(32));
    Arc::new(Engine::open(config).expect("engine should open"))
}

#[test]
fn stress_parallel_attacks_spend_each_event_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(dir.path());
    let user = engine.create_user("raider").unwrap().id;
    let boss = engine.boss(user).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));

    // 60 small events: 600 damage, well under the first boss's HP.
    for i in 0..60 {
        engine
            .award(Award::new(user, XpKind::FocusSession, 10).source("focus_session", i))
            .unwrap();
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.attack_boss(user, Some(7)).unwrap())
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let damage: i64 = outcomes.iter().map(|o| o.damage).sum();
    let used: usize = outcomes.iter().map(|o| o.events_used).sum();
    assert_eq!(used, THREADS * 7);
    assert_eq!(damage, (THREADS as i64) * 70);

    // Drain the rest.
    let rest = engine.attack_boss(user, None).unwrap();
    assert_eq!(rest.events_used, 60 - THREADS * 7);
    assert_eq!(rest.total_damage, 600);
    assert_eq!(rest.boss.id, boss.id);
    assert_eq!(rest.boss.hp_current, boss.hp_max - 600);
}

#[test]
fn stress_parallel_killing_blows_pay_one_bonus() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(dir.path());
    let user = engine.create_user("finisher").unwrap().id;
    let boss = engine.boss(user).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));

    for i in 0..THREADS {
        engine
            .award(Award::new(user, XpKind::GithubPr, boss.hp_max).source("github_pr", i))
            .unwrap();
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.attack_boss(user, Some(1)).unwrap())
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let defeats = outcomes.iter().filter(|o| o.defeated).count();
    assert_eq!(defeats, 1, "exactly one attack lands the killing blow");

    let bonus_events: Vec<_> = engine
        .list_events(user, 100)
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == XpKind::BossDefeat)
        .collect();
    assert_eq!(bonus_events.len(), 1);

    let winner = outcomes.iter().find(|o| o.defeated).unwrap();
    assert_eq!(winner.boss.id, boss.id);
    assert_eq!(winner.bonus_xp, boss.defeat_bonus());
}
