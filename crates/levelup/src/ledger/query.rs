//! Read access to the ledger.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{ProgressError, Result};
use crate::identity::UserId;

use super::event::{EventId, EventRow, XpEvent, XpKind, EVENT_COLUMNS};

pub fn get_event(conn: &Connection, id: EventId) -> Result<XpEvent> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM xp_events WHERE id = ?1");
    conn.query_row(&sql, params![id.0], EventRow::from_row)
        .optional()?
        .ok_or_else(|| ProgressError::NotFound(format!("xp event {id}")))?
        .decode()
}

pub fn find_by_source(
    conn: &Connection,
    user: UserId,
    source_type: &str,
    source_id: &str,
) -> Result<Option<XpEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM xp_events
         WHERE user_id = ?1 AND source_type = ?2 AND source_id = ?3"
    );
    conn.query_row(&sql, params![user.0, source_type, source_id], EventRow::from_row)
        .optional()?
        .map(EventRow::decode)
        .transpose()
}

/// Most recent events first.
pub fn list_events(conn: &Connection, user: UserId, limit: usize) -> Result<Vec<XpEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM xp_events WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    );
    collect(conn, &sql, params![user.0, limit as i64])
}

/// Events created at or after `since`, oldest first.
pub fn events_since(conn: &Connection, user: UserId, since: u64) -> Result<Vec<XpEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM xp_events WHERE user_id = ?1 AND created_at >= ?2
         ORDER BY created_at, id"
    );
    collect(conn, &sql, params![user.0, since as i64])
}

/// Sum of `kind` XP created in `[from, to)`.
pub fn sum_kind_between(
    conn: &Connection,
    user: UserId,
    kind: XpKind,
    from: u64,
    to: u64,
) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM xp_events
         WHERE user_id = ?1 AND kind = ?2 AND created_at >= ?3 AND created_at < ?4",
        params![user.0, kind.as_tag(), from as i64, to as i64],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of every event ever awarded to `user`; equals `UserStats::xp`.
pub fn total_xp(conn: &Connection, user: UserId) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM xp_events WHERE user_id = ?1",
        params![user.0],
        |row| row.get(0),
    )?;
    Ok(total)
}

fn collect(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<XpEvent>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, EventRow::from_row)?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.decode()?);
    }
    Ok(events)
}
