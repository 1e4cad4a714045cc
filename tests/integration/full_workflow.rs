//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Create a user and meet the first boss
//! 2. Earn XP from tasks, workouts, focus and learning
//! 3. Level up, allocate stat points, climb ranks
//! 4. Attack the boss with fresh events only
//! 5. Read analytics and the dashboard

use std::sync::Arc;

use chrono::NaiveDate;

use levelup::activity::{
    FocusKind, NewLearningLog, NewProject, NewSkill, NewSkillNode, NewTask, NewWorkout,
    SkillStatus, SkillUpdate, TaskKind, TaskStatus,
};
use levelup::{
    Award, Config, Engine, ManualClock, ProgressError, Rank, StatAllocation, Store, XpKind,
};

const SECRET: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

fn engine_at(date: NaiveDate, hour: u32) -> (Engine, Arc<ManualClock>) {
    let start = date.and_hms_opt(hour, 0, 0).expect("valid time");
    let clock = Arc::new(ManualClock::at_local(start).expect("local time exists"));
    let config = Config::for_dir(std::env::temp_dir()).with_action_secret(SECRET);
    let engine = Engine::with_parts(Store::open_in_memory().unwrap(), clock.clone(), config)
        .expect("engine should open");
    (engine, clock)
}

fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
}

#[test]
fn full_workflow_user_to_boss_damage() {
    let (engine, clock) = engine_at(wednesday(), 9);

    // ── Step 1: Create the user, meet the first boss ────────────────────
    let hero = engine.create_user("hero").expect("user should be created");
    let stats = engine.stats(hero.id).unwrap();
    assert_eq!(stats.level, 1);
    assert_eq!(stats.xp, 0);
    assert_eq!(stats.rank, Rank::E);

    let boss = engine.boss(hero.id).unwrap();
    assert_eq!(boss.name, "Regression Slime");
    assert_eq!(boss.hp_max, 1_240);
    clock.advance_minutes(1);

    // ── Step 2: Earn XP ─────────────────────────────────────────────────
    let project = engine
        .create_project(
            hero.id,
            &NewProject {
                name: "Shop".into(),
                is_commercial: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(engine.stats(hero.id).unwrap().dev_score, 300);

    let task = engine
        .create_task(
            hero.id,
            &NewTask {
                project_id: project.id,
                title: "Checkout flow".into(),
                kind: TaskKind::Main,
                difficulty: 3,
                deadline: None,
                notes: String::new(),
            },
        )
        .unwrap();
    let done = engine.complete_task(hero.id, task.id).unwrap();
    assert_eq!(done.status, TaskStatus::Done);

    let stats = engine.stats(hero.id).unwrap();
    assert_eq!(stats.xp, 150);
    assert_eq!(stats.level, 2);
    assert_eq!(stats.stat_points, 5);
    assert_eq!(stats.dev_score, 150 + 20 + 300);
    assert_eq!(stats.rank, Rank::E);

    // Completing twice is a no-op.
    engine.complete_task(hero.id, task.id).unwrap();
    assert_eq!(engine.stats(hero.id).unwrap().xp, 150);

    let workout = engine
        .log_workout(
            hero.id,
            &NewWorkout {
                kind: "run".into(),
                duration_minutes: 30,
                intensity: 5,
                date: None,
                comment: String::new(),
            },
        )
        .unwrap();
    assert_eq!(workout.date, wednesday());

    let stats = engine.stats(hero.id).unwrap();
    assert_eq!(stats.xp, 300);
    assert_eq!(stats.level, 3);
    assert_eq!(stats.xp_to_next_level, 300);
    assert_eq!(stats.stat_points, 10);
    assert_eq!(stats.rank, Rank::D);

    // ── Step 3: Allocate stat points ────────────────────────────────────
    let stats = engine
        .allocate_stat_points(
            hero.id,
            &StatAllocation {
                strength: 3,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(stats.strength, 4);
    assert_eq!(stats.stat_points, 7);

    let err = engine
        .allocate_stat_points(
            hero.id,
            &StatAllocation {
                vitality: 8,
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ProgressError::InsufficientPoints {
            requested: 8,
            available: 7
        }
    ));

    let (_, created) = engine
        .start_focus(hero.id, FocusKind::Coding, "refactor", None)
        .unwrap();
    assert!(created);
    clock.advance_minutes(30);
    let (session, xp) = engine.stop_focus(hero.id, "").unwrap();
    assert_eq!(xp, 60);
    assert_eq!(session.unwrap().xp_awarded, 60);

    // ── Step 4: Attack the boss ─────────────────────────────────────────
    let outcome = engine.attack_boss(hero.id, None).unwrap();
    assert_eq!(outcome.events_used, 3);
    assert_eq!(outcome.damage, 150 + 150 + 60);
    assert_eq!(outcome.boss.hp_current, 1_240 - 360);
    assert!(!outcome.defeated);

    let again = engine.attack_boss(hero.id, None).unwrap();
    assert_eq!(again.events_used, 0);
    assert_eq!(again.damage, 0);
    assert_eq!(again.boss.hp_current, 880);
    assert_eq!(again.total_damage, 360);

    engine
        .log_learning(
            hero.id,
            &NewLearningLog {
                title: "Read about B-trees".into(),
                description: String::new(),
                date: None,
            },
        )
        .unwrap();

    // ── Step 5: Read models ─────────────────────────────────────────────
    let events = engine.list_events(hero.id, 10).unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].kind, XpKind::LearningLog);
    assert_eq!(events[3].kind, XpKind::TaskComplete);

    let summary = engine.analytics(hero.id).unwrap();
    assert_eq!(summary.to, wednesday());
    assert_eq!(summary.xp_by_day.len(), 30);
    assert_eq!(summary.xp_by_day.last().unwrap().xp, 385);
    assert_eq!(summary.xp_by_kind[0].xp, 150);
    assert_eq!(summary.streak_current, 1);
    assert_eq!(summary.streak_best_30d, 1);

    let dash = engine.dashboard(hero.id).unwrap();
    assert_eq!(dash.xp, 385);
    assert_eq!(dash.workouts_this_week, 1);
    assert_eq!(dash.tasks_done, 1);
    assert_eq!(dash.skills_in_progress, 0);
}

#[test]
fn skill_tree_progression_to_mastery() {
    let (engine, _) = engine_at(wednesday(), 10);
    let user = engine.create_user("learner").unwrap().id;

    let track = engine.create_track("backend", "Backend", 1).unwrap();
    let node = engine
        .create_node(&NewSkillNode {
            track_id: track.id,
            code: "sql".into(),
            title: "SQL".into(),
            description: String::new(),
            max_level: 90,
            order: 1,
        })
        .unwrap();

    let skill = engine
        .create_skill(
            user,
            &NewSkill {
                name: "ignored".into(),
                category: String::new(),
                level: 0,
                node_id: Some(node.id),
            },
        )
        .unwrap();
    assert_eq!(skill.name, "SQL");
    assert_eq!(skill.category, "Backend");
    assert_eq!(skill.status, SkillStatus::Learning);

    let dup = engine.create_skill(
        user,
        &NewSkill {
            node_id: Some(node.id),
            ..Default::default()
        },
    );
    assert!(matches!(dup, Err(ProgressError::Validation { ref field, .. }) if field == "node_id"));

    let progress = engine
        .update_skill(
            user,
            skill.id,
            &SkillUpdate {
                level: Some(50),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(progress.xp_awarded, 100);
    assert_eq!(progress.skill.status, SkillStatus::Practicing);

    // Clamped to the node's max level, then mastered.
    let progress = engine
        .update_skill(
            user,
            skill.id,
            &SkillUpdate {
                level: Some(95),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(progress.skill.level, 90);
    assert_eq!(progress.skill.status, SkillStatus::Mastered);
    assert_eq!(progress.xp_awarded, 80 + 100);

    let stats = engine.stats(user).unwrap();
    assert_eq!(stats.xp, 280);
    assert_eq!(stats.dev_score, 280 + 90 * 5 + 100);
    assert_eq!(stats.rank, Rank::D);

    let mastery = engine
        .list_events(user, 10)
        .unwrap()
        .into_iter()
        .find(|e| e.source_type == "skill_mastered")
        .expect("mastery event recorded");
    assert_eq!(mastery.metadata["name"], "SQL");
    assert_eq!(mastery.metadata["category"], "Backend");

    let counts = engine.achievement_counts(user).unwrap();
    assert_eq!(counts.mastered_skills, 1);
    assert_eq!(counts.avg_skill_level, 90);

    let tree = engine.skill_tree().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].1[0].code, "sql");
}

#[test]
fn boss_defeat_credits_bonus_once_and_next_boss_scales() {
    let (engine, clock) = engine_at(wednesday(), 11);
    let user = engine.create_user("slayer").unwrap().id;
    engine.boss(user).unwrap();

    let award = Award::new(user, XpKind::GithubPr, 2_000).source("github_pr", "levelup#42");
    let (event, stats) = engine.award(award.clone()).unwrap();
    assert!(event.is_some());
    assert_eq!(stats.level, 6);

    // Replaying the same source key changes nothing.
    let (replay, stats) = engine.award(award).unwrap();
    assert!(replay.is_none());
    assert_eq!(stats.xp, 2_000);

    let outcome = engine.attack_boss(user, None).unwrap();
    assert!(outcome.defeated);
    assert_eq!(outcome.boss.hp_current, 0);
    assert_eq!(outcome.bonus_xp, 200 + 1_240 / 10);

    let stats = engine.stats(user).unwrap();
    assert_eq!(stats.xp, 2_324);
    assert_eq!(stats.level, 7);
    assert_eq!(stats.rank, Rank::C);

    clock.advance_secs(1);
    let next = engine.boss(user).unwrap();
    assert_ne!(next.id, outcome.boss.id);
    assert_eq!(next.rank, Rank::C);
    assert_eq!(next.name, "Context Devourer");
    assert_eq!(next.hp_max, 3_500 + 7 * 70);

    // Nothing earned since the new boss appeared.
    let idle = engine.attack_boss(user, None).unwrap();
    assert_eq!(idle.events_used, 0);

    let history = engine.boss_history(user, 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, next.id);
}

#[test]
fn users_are_isolated() {
    let (engine, _) = engine_at(wednesday(), 12);
    let alice = engine.create_user("alice").unwrap().id;
    let bob = engine.create_user("bob").unwrap().id;

    let project = engine
        .create_project(
            alice,
            &NewProject {
                name: "Private".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let task = engine
        .create_task(
            alice,
            &NewTask {
                project_id: project.id,
                title: "Secret".into(),
                kind: TaskKind::Daily,
                difficulty: 1,
                deadline: None,
                notes: String::new(),
            },
        )
        .unwrap();

    assert!(matches!(
        engine.complete_task(bob, task.id),
        Err(ProgressError::NotFound(_))
    ));
    assert!(engine.list_tasks(bob).unwrap().is_empty());
    assert_eq!(engine.stats(bob).unwrap().xp, 0);

    assert!(matches!(
        engine.create_user("alice"),
        Err(ProgressError::Validation { .. })
    ));
    assert_eq!(engine.find_user("bob").unwrap().unwrap().id, bob);
}
