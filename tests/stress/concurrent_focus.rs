//! Stress test: parallel focus starts and stops for one user against a
//! file-backed store. Only one session may ever be open, and it is paid
//! exactly once.

use std::sync::Arc;
use std::thread;

use levelup::activity::FocusKind;
use levelup::{Config, Engine};

const THREADS: usize = 8;

fn file_engine(dir: &std::path::Path) -> Arc<Engine> {
    let config = Config::for_dir(dir).with_action_secret("33".repeat(32));
    Arc::new(Engine::open(config).expect("engine should open"))
}

fn open_sessions(engine: &Engine, user: levelup::UserId) -> i64 {
    engine
        .store()
        .read(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM focus_sessions
                 WHERE user_id = ?1 AND ended_at IS NULL AND canceled = 0",
                [user.0],
                |r| r.get(0),
            )?)
        })
        .unwrap()
}

#[test]
fn stress_parallel_focus_starts_create_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(dir.path());
    let user = engine.create_user("focused").unwrap().id;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let (session, created) = engine
                    .start_focus(user, FocusKind::Coding, &format!("thread {t}"), None)
                    .expect("start should succeed");
                (session.id, created)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results.iter().filter(|(_, created)| *created).count();
    assert_eq!(created, 1, "exactly one start may create a session");
    assert!(results.iter().all(|(id, _)| *id == results[0].0));
    assert_eq!(open_sessions(&engine, user), 1);
}

#[test]
fn stress_parallel_focus_stops_award_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = file_engine(dir.path());
    let user = engine.create_user("finisher").unwrap().id;

    engine.start_focus(user, FocusKind::Reading, "", None).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let (session, _) = engine.stop_focus(user, "").expect("stop should succeed");
                session.is_some()
            })
        })
        .collect();

    let stopped = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|stopped| *stopped)
        .count();
    assert_eq!(stopped, 1, "only one stop may close the session");
    assert_eq!(open_sessions(&engine, user), 0);
    assert!(engine.active_focus(user).unwrap().is_none());
}
