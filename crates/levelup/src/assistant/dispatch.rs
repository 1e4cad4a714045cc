//! Executes a validated [`AssistantAction`] against the progression core.
//!
//! Results are plain JSON payloads for the chat surface.

use rusqlite::Connection;
use serde_json::{json, Value};

use crate::activity::{focus, tasks, FocusRules};
use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::progression;
use crate::raid::{self, BossRun};
use crate::time;

use super::action::AssistantAction;

fn boss_json(boss: &BossRun) -> Value {
    json!({
        "id": boss.id.0,
        "name": boss.name,
        "rank": boss.rank,
        "hp_current": boss.hp_current,
        "hp_max": boss.hp_max,
        "status": boss.status,
    })
}

/// Run `action` for `user`. Must be called inside a write transaction.
pub fn execute(
    conn: &Connection,
    user: UserId,
    action: &AssistantAction,
    rules: &FocusRules,
    now: u64,
) -> Result<Value> {
    log::info!("user {user} confirmed assistant action {}", action.name());
    match action {
        AssistantAction::HeroStats => {
            let stats = progression::ensure_stats(conn, user, now)?;
            Ok(json!({
                "level": stats.level,
                "xp": stats.xp,
                "rank": stats.rank,
                "dev_score": stats.dev_score,
            }))
        }
        AssistantAction::BossStatus => {
            let boss = raid::ensure_active_boss(conn, user, now)?;
            Ok(boss_json(&boss))
        }
        AssistantAction::BossNext => {
            let boss = raid::start_next_boss(conn, user, now)?;
            Ok(boss_json(&boss))
        }
        AssistantAction::BossAttack(args) => {
            let outcome = raid::attack(conn, user, args.max_events, now)?;
            Ok(json!({
                "boss": boss_json(&outcome.boss),
                "damage": outcome.damage,
                "events_used": outcome.events_used,
                "total_damage": outcome.total_damage,
                "defeated": outcome.defeated,
                "bonus_xp": outcome.bonus_xp,
            }))
        }
        AssistantAction::FocusStart(args) => {
            let (session, created) = focus::start_session(
                conn,
                user,
                args.kind,
                &args.note,
                args.skill_node_id,
                now,
            )?;
            Ok(json!({
                "id": session.id.0,
                "kind": session.kind,
                "started_at": time::micros_to_rfc3339(session.started_at),
                "created": created,
            }))
        }
        AssistantAction::FocusStop(args) => {
            let (session, xp) = focus::stop_session(conn, user, rules, &args.source_url, now)?;
            let session =
                session.ok_or_else(|| ProgressError::NotFound("no active focus session".into()))?;
            Ok(json!({
                "id": session.id.0,
                "ended_at": session.ended_at.map(time::micros_to_rfc3339),
                "duration_seconds": session.duration_seconds,
                "xp_awarded": xp,
            }))
        }
        AssistantAction::TaskComplete(args) => {
            let task = tasks::complete_task(conn, user, args.task_id, now)?;
            Ok(json!({
                "id": task.id.0,
                "title": task.title,
                "status": task.status,
                "xp_reward": task.xp_reward(),
            }))
        }
    }
}
