//! Focus sessions: a timer per user, at most one running at a time.
//!
//! Stopping a session converts whole minutes into XP under three limits:
//! sessions shorter than `min_minutes` earn nothing, at most
//! `session_cap_minutes` count per session, and focus XP credited during
//! one server-local day never exceeds `daily_cap_xp`.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::ledger::{self, Award, XpKind};
use crate::progression;
use crate::storage::sql_text_enum;
use crate::time::{self, MICROS_PER_SECOND};

use super::{optional_text, skills};

/// Conversion and cap parameters for focus XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusRules {
    pub xp_per_minute: i64,
    pub min_minutes: i64,
    pub session_cap_minutes: i64,
    pub daily_cap_xp: i64,
}

impl Default for FocusRules {
    fn default() -> Self {
        Self {
            xp_per_minute: 2,
            min_minutes: 5,
            session_cap_minutes: 120,
            daily_cap_xp: 300,
        }
    }
}

impl FocusRules {
    /// XP a session of `minutes` earns before the daily cap.
    pub fn session_xp(&self, minutes: i64) -> i64 {
        let counted = minutes.clamp(0, self.session_cap_minutes);
        if counted < self.min_minutes {
            return 0;
        }
        counted * self.xp_per_minute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub i64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

sql_text_enum! {
    pub enum FocusKind as "kind" {
        Coding => "coding",
        Learning => "learning",
        Debugging => "debugging",
        Reading => "reading",
        Review => "review",
        Interview => "interview",
    }
}

impl Default for FocusKind {
    fn default() -> Self {
        Self::Coding
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: SessionId,
    pub user: UserId,
    pub kind: FocusKind,
    pub note: String,
    pub skill_node_id: Option<i64>,
    pub started_at: u64,
    pub ended_at: Option<u64>,
    pub canceled: bool,
    pub duration_seconds: i64,
    pub xp_awarded: i64,
}

impl FocusSession {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none() && !self.canceled
    }
}

const SESSION_COLUMNS: &str = "id, user_id, kind, note, skill_node_id, started_at, ended_at, \
     canceled, duration_seconds, xp_awarded";

fn from_row(row: &Row<'_>) -> rusqlite::Result<FocusSession> {
    Ok(FocusSession {
        id: SessionId(row.get(0)?),
        user: UserId(row.get(1)?),
        kind: row.get(2)?,
        note: row.get(3)?,
        skill_node_id: row.get(4)?,
        started_at: row.get::<_, i64>(5)? as u64,
        ended_at: row.get::<_, Option<i64>>(6)?.map(|t| t as u64),
        canceled: row.get(7)?,
        duration_seconds: row.get(8)?,
        xp_awarded: row.get(9)?,
    })
}

/// The user's running session, if any.
pub fn active_session(conn: &Connection, user: UserId) -> Result<Option<FocusSession>> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM focus_sessions
         WHERE user_id = ?1 AND ended_at IS NULL AND canceled = 0"
    );
    Ok(conn
        .query_row(&sql, params![user.0], from_row)
        .optional()?)
}

fn get_session(conn: &Connection, id: SessionId) -> Result<FocusSession> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM focus_sessions WHERE id = ?1");
    conn.query_row(&sql, params![id.0], from_row)
        .optional()?
        .ok_or_else(|| ProgressError::NotFound(format!("focus session {id}")))
}

/// Start a session, or return the one already running.
///
/// The flag is `true` only when a new session was created. A running
/// session is returned as-is even if `kind` or `note` differ.
pub fn start_session(
    conn: &Connection,
    user: UserId,
    kind: FocusKind,
    note: &str,
    skill_node_id: Option<i64>,
    now: u64,
) -> Result<(FocusSession, bool)> {
    progression::ensure_stats(conn, user, now)?;
    if let Some(existing) = active_session(conn, user)? {
        log::debug!("user {user} already has focus session {}", existing.id);
        return Ok((existing, false));
    }

    let note = optional_text("note", note, 2000)?;
    if let Some(node_id) = skill_node_id {
        skills::get_node(conn, node_id).map_err(|_| {
            ProgressError::invalid("skill_node_id", format!("unknown skill node {node_id}"))
        })?;
    }

    conn.execute(
        "INSERT INTO focus_sessions (user_id, kind, note, skill_node_id, started_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)",
        params![user.0, kind, note, skill_node_id, now as i64],
    )?;
    let session = get_session(conn, SessionId(conn.last_insert_rowid()))?;
    log::info!("user {user} started {kind} focus session {}", session.id);
    Ok((session, true))
}

/// Focus XP already credited to `user` on the local day containing `now`.
pub fn focus_xp_today(conn: &Connection, user: UserId, now: u64) -> Result<i64> {
    let (start, end) = time::local_day_bounds(time::local_date(now));
    ledger::sum_kind_between(conn, user, XpKind::FocusSession, start, end)
}

/// Stop the running session and credit its XP.
///
/// Returns `(None, 0)` when nothing is running. `source_url` is recorded on
/// the XP event for provenance.
pub fn stop_session(
    conn: &Connection,
    user: UserId,
    rules: &FocusRules,
    source_url: &str,
    now: u64,
) -> Result<(Option<FocusSession>, i64)> {
    progression::ensure_stats(conn, user, now)?;
    let Some(mut session) = active_session(conn, user)? else {
        return Ok((None, 0));
    };

    let duration_seconds = (now.saturating_sub(session.started_at) / MICROS_PER_SECOND) as i64;
    let minutes = (duration_seconds / 60).min(rules.session_cap_minutes);
    let raw_xp = rules.session_xp(minutes);
    let used_today = focus_xp_today(conn, user, now)?;
    let remaining = (rules.daily_cap_xp - used_today).max(0);
    let xp = raw_xp.min(remaining);

    session.ended_at = Some(now);
    session.duration_seconds = duration_seconds;
    session.xp_awarded = xp;

    conn.execute(
        "UPDATE focus_sessions SET ended_at = ?2, duration_seconds = ?3, xp_awarded = ?4, updated_at = ?2
         WHERE id = ?1",
        params![session.id.0, now as i64, duration_seconds, xp],
    )?;

    Award::new(user, XpKind::FocusSession, xp)
        .source("focus_session", session.id)
        .source_url(source_url)
        .metadata(json!({
            "kind": session.kind,
            "minutes": minutes,
            "duration_seconds": duration_seconds,
            "skill_node_id": session.skill_node_id,
        }))
        .occurred_at(now)
        .apply(conn, now)?;

    log::info!(
        "user {user} stopped focus session {} after {minutes} min (+{xp} XP, {used_today} used today)",
        session.id
    );
    Ok((Some(session), xp))
}

/// Cancel the running session without awarding anything.
pub fn cancel_session(conn: &Connection, user: UserId, now: u64) -> Result<Option<FocusSession>> {
    progression::ensure_stats(conn, user, now)?;
    let Some(mut session) = active_session(conn, user)? else {
        return Ok(None);
    };

    let duration_seconds = (now.saturating_sub(session.started_at) / MICROS_PER_SECOND) as i64;
    conn.execute(
        "UPDATE focus_sessions SET ended_at = ?2, canceled = 1, duration_seconds = ?3, xp_awarded = 0,
            updated_at = ?2
         WHERE id = ?1",
        params![session.id.0, now as i64, duration_seconds],
    )?;
    session.ended_at = Some(now);
    session.canceled = true;
    session.duration_seconds = duration_seconds;
    session.xp_awarded = 0;

    log::info!("user {user} canceled focus session {}", session.id);
    Ok(Some(session))
}
