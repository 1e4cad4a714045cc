//! The per-user stats projection and the stat-point economy.
//!
//! `UserStats` is derived state: `xp` is the running sum of every ledger
//! event, and level, dev score and rank are recomputed on each change.
//! Every function here expects to run inside [`Store::write`], which holds
//! the write lock for the whole read-modify-write.
//!
//! [`Store::write`]: crate::storage::Store::write

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};
use crate::identity::{self, UserId};

use super::level::{self, Rank, STAT_POINTS_PER_LEVEL};
use super::score;

/// Upper bound for a single attribute increment in one allocation.
pub const MAX_ALLOCATION_PER_STAT: i64 = 999;

/// Hero stats for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user: UserId,
    pub level: i64,
    pub xp: i64,
    pub xp_to_next_level: i64,
    pub strength: i64,
    pub agility: i64,
    pub intelligence: i64,
    pub vitality: i64,
    pub stat_points: i64,
    pub dev_score: i64,
    pub rank: Rank,
    pub updated_at: u64,
}

/// Requested attribute increments. Missing fields count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatAllocation {
    pub strength: i64,
    pub agility: i64,
    pub intelligence: i64,
    pub vitality: i64,
}

impl StatAllocation {
    fn fields(&self) -> [(&'static str, i64); 4] {
        [
            ("strength", self.strength),
            ("agility", self.agility),
            ("intelligence", self.intelligence),
            ("vitality", self.vitality),
        ]
    }

    pub fn total(&self) -> i64 {
        self.fields().iter().map(|(_, v)| v).sum()
    }
}

const SELECT_STATS: &str = "SELECT user_id, level, xp, xp_to_next_level, strength, agility,
        intelligence, vitality, stat_points, dev_score, rank, updated_at
     FROM user_stats WHERE user_id = ?1";

fn from_row(row: &Row<'_>) -> rusqlite::Result<(UserStats, String)> {
    let rank: String = row.get(10)?;
    Ok((
        UserStats {
            user: UserId(row.get(0)?),
            level: row.get(1)?,
            xp: row.get(2)?,
            xp_to_next_level: row.get(3)?,
            strength: row.get(4)?,
            agility: row.get(5)?,
            intelligence: row.get(6)?,
            vitality: row.get(7)?,
            stat_points: row.get(8)?,
            dev_score: row.get(9)?,
            rank: Rank::E,
            updated_at: row.get::<_, i64>(11)? as u64,
        },
        rank,
    ))
}

fn load(conn: &Connection, user: UserId) -> Result<Option<UserStats>> {
    let row = conn
        .query_row(SELECT_STATS, params![user.0], from_row)
        .optional()?;
    match row {
        Some((mut stats, rank)) => {
            stats.rank = Rank::parse(&rank)?;
            Ok(Some(stats))
        }
        None => Ok(None),
    }
}

/// Get the stats row for `user`, creating the default row on first access.
pub fn ensure_stats(conn: &Connection, user: UserId, now: u64) -> Result<UserStats> {
    if let Some(stats) = load(conn, user)? {
        return Ok(stats);
    }

    // Surface a missing owner as not-found rather than a foreign-key failure.
    identity::get_user(conn, user)?;
    conn.execute(
        "INSERT OR IGNORE INTO user_stats (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![user.0, now as i64],
    )?;
    log::debug!("created stats row for user {user}");

    load(conn, user)?
        .ok_or_else(|| ProgressError::Storage(format!("stats row for user {user} vanished")))
}

fn save(conn: &Connection, stats: &UserStats) -> Result<()> {
    conn.execute(
        "UPDATE user_stats SET level = ?2, xp = ?3, xp_to_next_level = ?4, strength = ?5,
            agility = ?6, intelligence = ?7, vitality = ?8, stat_points = ?9,
            dev_score = ?10, rank = ?11, updated_at = ?12
         WHERE user_id = ?1",
        params![
            stats.user.0,
            stats.level,
            stats.xp,
            stats.xp_to_next_level,
            stats.strength,
            stats.agility,
            stats.intelligence,
            stats.vitality,
            stats.stat_points,
            stats.dev_score,
            stats.rank.as_str(),
            stats.updated_at as i64,
        ],
    )?;
    Ok(())
}

/// Apply `amount` XP to the projection: level up (possibly several levels),
/// grant stat points, and refresh dev score and rank.
///
/// A non-positive amount is a no-op that returns the current stats.
pub fn add_xp(conn: &Connection, user: UserId, amount: i64, now: u64) -> Result<UserStats> {
    let mut stats = ensure_stats(conn, user, now)?;
    if amount <= 0 {
        return Ok(stats);
    }

    stats.xp = stats.xp.checked_add(amount).ok_or_else(|| {
        ProgressError::invalid("amount", "award would overflow the XP total")
    })?;

    let before_level = stats.level;
    stats.level = level::level_up(stats.level, stats.xp);
    let levels_gained = stats.level - before_level;
    if levels_gained > 0 {
        stats.stat_points += levels_gained * STAT_POINTS_PER_LEVEL;
        log::info!(
            "user {user} reached level {} (+{levels_gained}, +{} stat points)",
            stats.level,
            levels_gained * STAT_POINTS_PER_LEVEL
        );
    }
    stats.xp_to_next_level = level::xp_to_next_level(stats.level);

    let breakdown = score::breakdown_for(conn, &stats)?;
    stats.dev_score = breakdown.dev_score;
    stats.rank = breakdown.rank;
    stats.updated_at = now;

    save(conn, &stats)?;
    Ok(stats)
}

/// Persist a freshly computed dev score and rank; also clamps the level to
/// at least 1.
pub(crate) fn store_score(
    conn: &Connection,
    stats: &mut UserStats,
    dev_score: i64,
    rank: Rank,
    now: u64,
) -> Result<()> {
    stats.dev_score = dev_score;
    stats.rank = rank;
    stats.level = stats.level.max(1);
    stats.xp_to_next_level = level::xp_to_next_level(stats.level);
    stats.updated_at = now;
    save(conn, stats)
}

/// Move points from the unallocated pool into attributes.
///
/// Fails with a validation error for a negative (or absurdly large) delta,
/// and with `InsufficientPoints` when the total exceeds the pool. Nothing
/// is written on failure. A zero total is a no-op.
pub fn allocate_stat_points(
    conn: &Connection,
    user: UserId,
    delta: &StatAllocation,
    now: u64,
) -> Result<UserStats> {
    for (field, value) in delta.fields() {
        if value < 0 {
            return Err(ProgressError::invalid(
                field,
                "cannot allocate a negative number of points",
            ));
        }
        if value > MAX_ALLOCATION_PER_STAT {
            return Err(ProgressError::invalid(
                field,
                format!("at most {MAX_ALLOCATION_PER_STAT} points per request"),
            ));
        }
    }

    let mut stats = ensure_stats(conn, user, now)?;
    let total = delta.total();
    if total <= 0 {
        return Ok(stats);
    }
    if total > stats.stat_points {
        return Err(ProgressError::InsufficientPoints {
            requested: total,
            available: stats.stat_points,
        });
    }

    stats.strength += delta.strength;
    stats.agility += delta.agility;
    stats.intelligence += delta.intelligence;
    stats.vitality += delta.vitality;
    stats.stat_points -= total;
    stats.updated_at = now;
    save(conn, &stats)?;

    log::info!("user {user} allocated {total} stat points");
    Ok(stats)
}
