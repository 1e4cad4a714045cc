//! Stress test: many threads race to credit the same and distinct source
//! keys against one file-backed store. Each key must be credited exactly
//! once and the stats projection must equal the ledger sum.

use std::sync::Arc;
use std::thread;

use levelup::ledger::total_xp;
use levelup::progression::level_for_xp;
use levelup::{Award, Config, Engine, XpKind};

const THREADS: usize = 8;
const KEYS: usize = 50;

fn file_engine(dir: &std::path::Path) -> Arc<Engine> {
    let config = Config::for_dir(dir).with_action_secret("11".repeat(32));
    Arc::new(Engine::open(config).expect("engine should open"))
}

#[test]
fn stress_duplicate_keys_credit_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(dir.path());
    let user = engine.create_user("racer").unwrap().id;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..KEYS)
                    .map(|key| {
                        let award = Award::new(user, XpKind::GithubCommit, 10)
                            .source("github_commit", key);
                        let (event, _) = engine.award(award).expect("award should succeed");
                        event.expect("keyed award always returns an event").id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    // Every thread sees the same event for a given key.
    let seen: Vec<Vec<_>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for ids in &seen[1..] {
        assert_eq!(ids, &seen[0]);
    }

    let events = engine.list_events(user, 1_000).unwrap();
    assert_eq!(events.len(), KEYS, "every key must be credited exactly once");

    let stats = engine.stats(user).unwrap();
    assert_eq!(stats.xp, (KEYS as i64) * 10);
    assert_eq!(stats.level, level_for_xp(stats.xp));
    let ledger_sum = engine
        .store()
        .read(|conn| total_xp(conn, user))
        .unwrap();
    assert_eq!(stats.xp, ledger_sum);
}

#[test]
fn stress_distinct_users_progress_independently() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(dir.path());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let user = engine.create_user(&format!("user-{t}")).unwrap().id;
                for i in 0..KEYS {
                    let award =
                        Award::new(user, XpKind::Workout, (t as i64) + 1).source("workout", i);
                    engine.award(award).unwrap();
                }
                user
            })
        })
        .collect();

    for (t, handle) in handles.into_iter().enumerate() {
        let user = handle.join().unwrap();
        let stats = engine.stats(user).unwrap();
        assert_eq!(stats.xp, (KEYS as i64) * ((t as i64) + 1));
        assert_eq!(stats.stat_points, (stats.level - 1) * 5);
    }
}

#[test]
fn stress_concurrent_allocations_never_overspend() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(dir.path());
    let user = engine.create_user("spender").unwrap().id;

    // 600 XP -> level 4 -> 15 points.
    engine
        .award(Award::new(user, XpKind::LearningLog, 600).source("import", "seed"))
        .unwrap();
    assert_eq!(engine.stats(user).unwrap().stat_points, 15);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let delta = levelup::StatAllocation {
                    agility: 2,
                    ..Default::default()
                };
                engine.allocate_stat_points(user, &delta).is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 7);

    let stats = engine.stats(user).unwrap();
    assert_eq!(stats.stat_points, 1);
    assert_eq!(stats.agility, 1 + 14);
}
