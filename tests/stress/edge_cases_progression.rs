//! Edge cases: boundary values, rejected inputs and no-op paths across
//! the progression core.

use std::sync::Arc;

use chrono::NaiveDate;

use levelup::activity::{FocusKind, NewLearningLog, NewProject, NewSkill, NewTask, NewWorkout, TaskKind};
use levelup::ledger::MAX_AWARD_AMOUNT;
use levelup::progression::{level_for_xp, xp_required_to_reach_level};
use levelup::{
    Award, Config, Engine, ManualClock, ProgressError, StatAllocation, Store, UserId, XpKind,
};

fn engine_at(date: NaiveDate, hour: u32) -> (Engine, Arc<ManualClock>) {
    let start = date.and_hms_opt(hour, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::at_local(start).unwrap());
    let config = Config::for_dir(std::env::temp_dir()).with_action_secret("55".repeat(32));
    let engine = Engine::with_parts(Store::open_in_memory().unwrap(), clock.clone(), config).unwrap();
    (engine, clock)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
}

fn field_of(err: ProgressError) -> String {
    err.field().to_string()
}

// ── Ledger ──────────────────────────────────────────────────────────────────

#[test]
fn edge_non_positive_awards_are_noops() {
    let (engine, _) = engine_at(day(4), 10);
    let user = engine.create_user("zero").unwrap().id;

    for amount in [0, -50] {
        let (event, stats) = engine
            .award(Award::new(user, XpKind::Workout, amount).source("workout", amount))
            .unwrap();
        assert!(event.is_none());
        assert_eq!(stats.xp, 0);
    }
    assert!(engine.list_events(user, 10).unwrap().is_empty());
}

#[test]
fn edge_single_award_jumps_many_levels() {
    let (engine, _) = engine_at(day(4), 10);
    let user = engine.create_user("jumper").unwrap().id;

    let xp = xp_required_to_reach_level(10);
    let (_, stats) = engine
        .award(Award::new(user, XpKind::GithubPr, xp).source("github_pr", "big"))
        .unwrap();
    assert_eq!(stats.level, 10);
    assert_eq!(stats.stat_points, 45);

    let (_, stats) = engine
        .award(Award::new(user, XpKind::GithubPr, 1).source("github_pr", "tiny"))
        .unwrap();
    assert_eq!(stats.level, level_for_xp(xp + 1));
    assert_eq!(stats.level, 10);
}

#[test]
fn edge_oversized_award_is_rejected_without_side_effects() {
    let (engine, _) = engine_at(day(4), 10);
    let user = engine.create_user("whale").unwrap().id;

    let err = engine
        .award(Award::new(user, XpKind::GithubPr, i64::MAX).source("github_pr", "huge"))
        .unwrap_err();
    assert_eq!(field_of(err), "amount");

    let err = engine
        .award(Award::new(user, XpKind::GithubPr, MAX_AWARD_AMOUNT + 1))
        .unwrap_err();
    assert_eq!(field_of(err), "amount");

    assert!(engine.list_events(user, 10).unwrap().is_empty());
    let stats = engine.stats(user).unwrap();
    assert_eq!(stats.xp, 0);
    assert_eq!(stats.level, 1);

    // The same key still works with a sane amount.
    let (event, stats) = engine
        .award(Award::new(user, XpKind::GithubPr, MAX_AWARD_AMOUNT).source("github_pr", "huge"))
        .unwrap();
    assert!(event.is_some());
    assert_eq!(stats.level, level_for_xp(MAX_AWARD_AMOUNT));
}

#[test]
fn edge_unkeyed_awards_are_never_deduplicated() {
    let (engine, _) = engine_at(day(4), 10);
    let user = engine.create_user("repeat").unwrap().id;
    for _ in 0..3 {
        engine
            .award(Award::new(user, XpKind::LearningLog, 5))
            .unwrap();
    }
    assert_eq!(engine.stats(user).unwrap().xp, 15);
}

#[test]
fn edge_unknown_user() {
    let (engine, _) = engine_at(day(4), 10);
    let ghost = UserId(999);
    assert!(matches!(engine.stats(ghost), Err(ProgressError::NotFound(_))));
    assert!(matches!(
        engine.award(Award::new(ghost, XpKind::Workout, 10)),
        Err(ProgressError::NotFound(_))
    ));
    assert!(matches!(
        engine.create_user("   "),
        Err(ProgressError::Validation { .. })
    ));
}

// ── Stat allocation ─────────────────────────────────────────────────────────

#[test]
fn edge_allocation_rejects_negative_and_zero_is_noop() {
    let (engine, _) = engine_at(day(4), 10);
    let user = engine.create_user("alloc").unwrap().id;
    engine
        .award(Award::new(user, XpKind::Workout, 100).source("workout", 1))
        .unwrap();

    let err = engine
        .allocate_stat_points(
            user,
            &StatAllocation {
                intelligence: -1,
                strength: 2,
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(field_of(err), "intelligence");

    let stats = engine
        .allocate_stat_points(user, &StatAllocation::default())
        .unwrap();
    assert_eq!(stats.stat_points, 5);
    assert_eq!(stats.strength, 1);

    let stats = engine
        .allocate_stat_points(
            user,
            &StatAllocation {
                strength: 1,
                agility: 1,
                intelligence: 1,
                vitality: 2,
            },
        )
        .unwrap();
    assert_eq!(stats.stat_points, 0);
    assert_eq!(stats.vitality, 3);
}

// ── Producers ───────────────────────────────────────────────────────────────

#[test]
fn edge_workout_bounds() {
    let (engine, _) = engine_at(day(4), 10);
    let user = engine.create_user("athlete").unwrap().id;
    let base = NewWorkout {
        kind: "swim".into(),
        duration_minutes: 1,
        intensity: 1,
        date: None,
        comment: String::new(),
    };

    let w = engine.log_workout(user, &base).unwrap();
    assert_eq!(w.xp(), 1);

    for (minutes, intensity, field) in [(0, 5, "duration_minutes"), (10, 0, "intensity"), (10, 11, "intensity")] {
        let err = engine
            .log_workout(
                user,
                &NewWorkout {
                    duration_minutes: minutes,
                    intensity,
                    ..base.clone()
                },
            )
            .unwrap_err();
        assert_eq!(field_of(err), field);
    }

    let err = engine
        .log_workout(
            user,
            &NewWorkout {
                kind: "  ".into(),
                ..base
            },
        )
        .unwrap_err();
    assert_eq!(field_of(err), "type");
    assert_eq!(engine.stats(user).unwrap().xp, 1);
}

#[test]
fn edge_learning_and_task_validation() {
    let (engine, _) = engine_at(day(4), 10);
    let user = engine.create_user("student").unwrap().id;

    let err = engine
        .log_learning(
            user,
            &NewLearningLog {
                title: "".into(),
                description: "empty".into(),
                date: None,
            },
        )
        .unwrap_err();
    assert_eq!(field_of(err), "title");

    let project = engine
        .create_project(
            user,
            &NewProject {
                name: "Dup".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let err = engine
        .create_project(
            user,
            &NewProject {
                name: "Dup".into(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(field_of(err), "name");

    for difficulty in [0, 6] {
        let err = engine
            .create_task(
                user,
                &NewTask {
                    project_id: project.id,
                    title: "Too hard".into(),
                    kind: TaskKind::Internship,
                    difficulty,
                    deadline: None,
                    notes: String::new(),
                },
            )
            .unwrap_err();
        assert_eq!(field_of(err), "difficulty");
    }

    let err = engine
        .create_skill(
            user,
            &NewSkill {
                name: "Rust".into(),
                level: 101,
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(field_of(err), "level");
}

// ── Focus ───────────────────────────────────────────────────────────────────

#[test]
fn edge_focus_minimum_and_session_cap() {
    let (engine, clock) = engine_at(day(5), 8);
    let user = engine.create_user("focused").unwrap().id;

    engine.start_focus(user, FocusKind::Coding, "", None).unwrap();
    clock.advance_secs(4 * 60 + 59);
    let (session, xp) = engine.stop_focus(user, "").unwrap();
    assert_eq!(xp, 0);
    assert_eq!(session.unwrap().duration_seconds, 299);
    assert!(engine.list_events(user, 10).unwrap().is_empty());

    engine.start_focus(user, FocusKind::Review, "", None).unwrap();
    clock.advance_minutes(200);
    let (_, xp) = engine.stop_focus(user, "").unwrap();
    assert_eq!(xp, 240);

    // 60 XP left under the daily cap of 300.
    engine.start_focus(user, FocusKind::Learning, "", None).unwrap();
    clock.advance_minutes(60);
    let (session, xp) = engine.stop_focus(user, "https://example.test/pr/1").unwrap();
    assert_eq!(xp, 60);
    assert_eq!(session.unwrap().xp_awarded, 60);

    engine.start_focus(user, FocusKind::Learning, "", None).unwrap();
    clock.advance_minutes(30);
    let (session, xp) = engine.stop_focus(user, "").unwrap();
    assert_eq!(xp, 0);
    assert!(session.unwrap().ended_at.is_some());
    assert_eq!(engine.stats(user).unwrap().xp, 300);
}

#[test]
fn edge_focus_cap_resets_next_local_day() {
    let (engine, clock) = engine_at(day(6), 12);
    let user = engine.create_user("nightowl").unwrap().id;

    engine.start_focus(user, FocusKind::Coding, "", None).unwrap();
    clock.advance_minutes(120);
    assert_eq!(engine.stop_focus(user, "").unwrap().1, 240);
    engine.start_focus(user, FocusKind::Coding, "", None).unwrap();
    clock.advance_minutes(120);
    assert_eq!(engine.stop_focus(user, "").unwrap().1, 60);

    // 16:00 -> 12:00 next day.
    clock.advance_minutes(20 * 60);
    engine.start_focus(user, FocusKind::Coding, "", None).unwrap();
    clock.advance_minutes(10);
    assert_eq!(engine.stop_focus(user, "").unwrap().1, 20);
}

#[test]
fn edge_focus_stop_and_cancel_without_session() {
    let (engine, _) = engine_at(day(7), 9);
    let user = engine.create_user("idle").unwrap().id;
    let (session, xp) = engine.stop_focus(user, "").unwrap();
    assert!(session.is_none());
    assert_eq!(xp, 0);
    assert!(engine.cancel_focus(user).unwrap().is_none());

    let err = engine
        .start_focus(user, FocusKind::Coding, "", Some(12345))
        .unwrap_err();
    assert_eq!(field_of(err), "skill_node_id");
}

// ── Analytics ───────────────────────────────────────────────────────────────

#[test]
fn edge_streak_ends_today() {
    let (engine, clock) = engine_at(day(10), 9);
    let user = engine.create_user("streaker").unwrap().id;

    // XP on May 10, 11 and 12.
    for i in 0..3 {
        if i > 0 {
            clock.advance_minutes(24 * 60);
        }
        engine
            .award(Award::new(user, XpKind::LearningLog, 25).source("learning_log", i))
            .unwrap();
    }

    let summary = engine.analytics(user).unwrap();
    assert_eq!(summary.to, day(12));
    assert_eq!(summary.from, NaiveDate::from_ymd_opt(2026, 4, 13).unwrap());
    assert_eq!(summary.xp_by_day.last().unwrap().xp, 25);
    assert_eq!(summary.streak_current, 3);
    assert_eq!(summary.streak_best_30d, 3);

    // A day without XP so far: the current streak is zero, the best stays.
    clock.advance_minutes(24 * 60);
    let summary = engine.analytics(user).unwrap();
    assert_eq!(summary.xp_by_day.last().unwrap().xp, 0);
    assert_eq!(summary.streak_current, 0);
    assert_eq!(summary.streak_best_30d, 3);
}
