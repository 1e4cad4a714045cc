//! Boss raid engine: generation, attacks and the defeat bonus.
//!
//! Every function runs inside [`Store::write`](crate::storage::Store::write);
//! the transaction's write lock covers the boss row and the candidate
//! events from selection to commit, so two concurrent attacks cannot spend
//! the same event or both defeat the boss.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::ledger::{Award, XpKind};
use crate::progression;

use super::types::*;

const BOSS_COLUMNS: &str =
    "id, user_id, name, rank, hp_max, hp_current, status, started_at, defeated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<BossRun> {
    Ok(BossRun {
        id: BossId(row.get(0)?),
        user: UserId(row.get(1)?),
        name: row.get(2)?,
        rank: row.get(3)?,
        hp_max: row.get(4)?,
        hp_current: row.get(5)?,
        status: row.get(6)?,
        started_at: row.get::<_, i64>(7)? as u64,
        defeated_at: row.get::<_, Option<i64>>(8)?.map(|t| t as u64),
    })
}

fn active_boss(conn: &Connection, user: UserId) -> Result<Option<BossRun>> {
    let sql = format!("SELECT {BOSS_COLUMNS} FROM boss_runs WHERE user_id = ?1 AND status = ?2");
    Ok(conn
        .query_row(&sql, params![user.0, BossStatus::Active], from_row)
        .optional()?)
}

fn get_boss(conn: &Connection, id: BossId) -> Result<BossRun> {
    let sql = format!("SELECT {BOSS_COLUMNS} FROM boss_runs WHERE id = ?1");
    conn.query_row(&sql, params![id.0], from_row)
        .optional()?
        .ok_or_else(|| ProgressError::NotFound(format!("boss {id}")))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Return the user's active boss, generating one from their current rank
/// and level if there is none.
pub fn ensure_active_boss(conn: &Connection, user: UserId, now: u64) -> Result<BossRun> {
    let stats = progression::ensure_stats(conn, user, now)?;
    if let Some(boss) = active_boss(conn, user)? {
        return Ok(boss);
    }

    let profile = boss_profile_for(stats.rank);
    let hp = profile.hp_for_level(stats.level);
    conn.execute(
        "INSERT INTO boss_runs (user_id, name, rank, hp_max, hp_current, status, started_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?6)",
        params![user.0, profile.name, profile.rank, hp, BossStatus::Active, now as i64],
    )?;
    let boss = get_boss(conn, BossId(conn.last_insert_rowid()))?;
    log::info!(
        "user {user} faces boss {} '{}' (rank {}, {} HP)",
        boss.id,
        boss.name,
        boss.rank,
        boss.hp_max
    );
    Ok(boss)
}

/// Retire the active boss, beaten or not, and generate a fresh one.
/// Skipping a boss credits no bonus.
pub fn start_next_boss(conn: &Connection, user: UserId, now: u64) -> Result<BossRun> {
    progression::ensure_stats(conn, user, now)?;
    if let Some(current) = active_boss(conn, user)? {
        conn.execute(
            "UPDATE boss_runs SET status = ?2, defeated_at = ?3 WHERE id = ?1",
            params![current.id.0, BossStatus::Defeated, now as i64],
        )?;
        log::info!(
            "user {user} skipped boss {} at {}/{} HP",
            current.id,
            current.hp_current,
            current.hp_max
        );
    }
    ensure_active_boss(conn, user, now)
}

// ---------------------------------------------------------------------------
// Attack
// ---------------------------------------------------------------------------

/// Sum of every damage row recorded against `boss`.
pub fn total_damage(conn: &Connection, boss: BossId) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM boss_damage WHERE boss_id = ?1",
        params![boss.0],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Spend up to `max_events` unconsumed XP events as damage against the
/// active boss.
///
/// `max_events` defaults to 200 and is clamped to `1..=500`. Events older
/// than the boss are never eligible. A call with nothing new to spend deals
/// zero damage and changes nothing.
pub fn attack(
    conn: &Connection,
    user: UserId,
    max_events: Option<usize>,
    now: u64,
) -> Result<AttackOutcome> {
    let limit = max_events
        .unwrap_or(DEFAULT_ATTACK_EVENTS)
        .clamp(1, MAX_ATTACK_EVENTS);
    let mut boss = ensure_active_boss(conn, user, now)?;

    let candidates: Vec<(i64, i64)> = {
        let mut stmt = conn.prepare(
            "SELECT e.id, e.amount FROM xp_events e
             WHERE e.user_id = ?1 AND e.created_at >= ?2
               AND NOT EXISTS (SELECT 1 FROM boss_damage d WHERE d.xp_event_id = e.id)
             ORDER BY e.created_at, e.id
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![user.0, boss.started_at as i64, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut damage = 0;
    let mut events_used = 0;
    {
        let mut insert = conn.prepare(
            "INSERT OR IGNORE INTO boss_damage (boss_id, xp_event_id, amount, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (event_id, amount) in candidates {
            let amount = amount.max(0);
            if insert.execute(params![boss.id.0, event_id, amount, now as i64])? > 0 {
                damage += amount;
                events_used += 1;
            }
        }
    }

    if damage > 0 {
        boss.hp_current = (boss.hp_current - damage).max(0);
        conn.execute(
            "UPDATE boss_runs SET hp_current = ?2 WHERE id = ?1",
            params![boss.id.0, boss.hp_current],
        )?;
    }

    let mut defeated = false;
    let mut bonus_xp = 0;
    if boss.hp_current == 0 && boss.is_active() {
        boss.status = BossStatus::Defeated;
        boss.defeated_at = Some(now);
        conn.execute(
            "UPDATE boss_runs SET status = ?2, defeated_at = ?3 WHERE id = ?1",
            params![boss.id.0, BossStatus::Defeated, now as i64],
        )?;
        defeated = true;
        bonus_xp = Award::new(user, XpKind::BossDefeat, boss.defeat_bonus())
            .source("boss_run", boss.id)
            .metadata(json!({
                "boss_name": boss.name,
                "boss_rank": boss.rank,
                "boss_hp_max": boss.hp_max,
            }))
            .occurred_at(now)
            .credit(conn, now)?;
        log::info!(
            "user {user} defeated boss {} '{}' (+{bonus_xp} XP)",
            boss.id,
            boss.name
        );
    } else if events_used > 0 {
        log::info!(
            "user {user} hit boss {} for {damage} ({events_used} events, {}/{} HP left)",
            boss.id,
            boss.hp_current,
            boss.hp_max
        );
    }

    let total_damage = total_damage(conn, boss.id)?;
    Ok(AttackOutcome {
        boss,
        damage,
        events_used,
        total_damage,
        defeated,
        bonus_xp,
    })
}

/// Past and current bosses, newest first.
pub fn boss_history(conn: &Connection, user: UserId, limit: usize) -> Result<Vec<BossRun>> {
    let sql = format!(
        "SELECT {BOSS_COLUMNS} FROM boss_runs WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user.0, limit as i64], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
