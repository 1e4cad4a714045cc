//! The single entry point through which XP enters the system.

use rusqlite::{params, Connection};

use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::progression::{self, UserStats};

use super::event::{EventId, XpEvent, XpKind};
use super::query;

/// Largest amount a single award may carry.
pub const MAX_AWARD_AMOUNT: i64 = 1_000_000;

/// Builder for an XP award.
///
/// ```ignore
/// let (event, stats) = Award::new(user, XpKind::Workout, 450)
///     .source("workout", workout.id)
///     .metadata(serde_json::json!({"intensity": 9}))
///     .apply(conn, now)?;
/// ```
#[derive(Debug, Clone)]
pub struct Award {
    user: UserId,
    kind: XpKind,
    amount: i64,
    source_type: String,
    source_id: String,
    source_url: String,
    metadata: serde_json::Value,
    occurred_at: Option<u64>,
}

impl Award {
    pub fn new(user: UserId, kind: XpKind, amount: i64) -> Self {
        Self {
            user,
            kind,
            amount,
            source_type: String::new(),
            source_id: String::new(),
            source_url: String::new(),
            metadata: serde_json::Value::Object(Default::default()),
            occurred_at: None,
        }
    }

    /// Deduplication key. An award whose key was already credited for this
    /// user applies no XP.
    pub fn source(mut self, source_type: impl Into<String>, source_id: impl ToString) -> Self {
        self.source_type = source_type.into();
        self.source_id = source_id.to_string();
        self
    }

    /// Provenance link (commit, PR, article, ...).
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// When the underlying real-world event happened.
    pub fn occurred_at(mut self, micros: u64) -> Self {
        self.occurred_at = Some(micros);
        self
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    fn keyed(&self) -> bool {
        !self.source_type.is_empty() && !self.source_id.is_empty()
    }

    /// Record the award. See [`award`].
    pub fn apply(self, conn: &Connection, now: u64) -> Result<(Option<XpEvent>, UserStats)> {
        award(conn, self, now)
    }

    /// Record the award and return the XP actually credited: the amount for
    /// a new event, zero for a duplicate or non-positive award.
    pub fn credit(self, conn: &Connection, now: u64) -> Result<i64> {
        let amount = self.amount;
        let (_, _, fresh) = record(conn, self, now)?;
        Ok(if fresh { amount } else { 0 })
    }
}

/// Record an XP event and fold it into the user's stats.
///
/// - `amount <= 0`: nothing is written; returns `(None, current stats)`.
/// - `amount > MAX_AWARD_AMOUNT`: validation error on `amount`.
/// - keyed award whose `(source_type, source_id)` was already credited:
///   nothing is written; returns the earlier event and current stats.
/// - otherwise a new event is inserted and the stats projection updated in
///   the same transaction.
pub fn award(conn: &Connection, req: Award, now: u64) -> Result<(Option<XpEvent>, UserStats)> {
    let (event, stats, _) = record(conn, req, now)?;
    Ok((event, stats))
}

fn record(conn: &Connection, req: Award, now: u64) -> Result<(Option<XpEvent>, UserStats, bool)> {
    let stats = progression::ensure_stats(conn, req.user, now)?;
    if req.amount <= 0 {
        return Ok((None, stats, false));
    }
    if req.amount > MAX_AWARD_AMOUNT {
        return Err(ProgressError::invalid(
            "amount",
            format!("a single award is limited to {MAX_AWARD_AMOUNT} XP"),
        ));
    }

    let metadata = serde_json::to_string(&req.metadata)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO xp_events
            (user_id, kind, amount, source_type, source_id, source_url, metadata, occurred_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            req.user.0,
            req.kind.as_tag(),
            req.amount,
            req.source_type,
            req.source_id,
            req.source_url,
            metadata,
            req.occurred_at.map(|t| t as i64),
            now as i64,
        ],
    )?;

    if inserted == 0 {
        if !req.keyed() {
            return Err(ProgressError::Storage("xp event insert was ignored".into()));
        }
        let existing = query::find_by_source(conn, req.user, &req.source_type, &req.source_id)?
            .ok_or_else(|| {
                ProgressError::Storage(format!(
                    "conflicting xp event {}:{} not found",
                    req.source_type, req.source_id
                ))
            })?;
        log::debug!(
            "user {} already credited for {}:{} (event {}), skipping",
            req.user,
            req.source_type,
            req.source_id,
            existing.id
        );
        return Ok((Some(existing), stats, false));
    }

    let event = query::get_event(conn, EventId(conn.last_insert_rowid()))?;
    let stats = progression::add_xp(conn, req.user, req.amount, now)?;
    log::info!(
        "user {} +{} XP ({}) -> total {}",
        req.user,
        req.amount,
        req.kind,
        stats.xp
    );
    Ok((Some(event), stats, true))
}
