//! Read models over the ledger: XP history, streaks and the dashboard.
//!
//! Days are server-local calendar days.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::activity::workouts;
use crate::error::Result;
use crate::identity::UserId;
use crate::ledger::XpKind;
use crate::progression::{self, Rank};
use crate::time;

/// Days covered by the per-day and per-kind breakdowns, today included.
pub const ANALYTICS_WINDOW_DAYS: u64 = 30;
/// How far back the current streak is followed.
pub const STREAK_LOOKBACK_DAYS: u64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyXp {
    pub date: NaiveDate,
    pub xp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindXp {
    pub kind: XpKind,
    pub xp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// One entry per day of the window, oldest first, zero days included.
    pub xp_by_day: Vec<DailyXp>,
    /// Kinds with XP in the window, largest first.
    pub xp_by_kind: Vec<KindXp>,
    /// Consecutive days with XP ending today; 0 if today has none.
    pub streak_current: u64,
    /// Longest run of days with XP inside the window.
    pub streak_best_30d: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub level: i64,
    pub xp: i64,
    pub xp_to_next_level: i64,
    pub rank: Rank,
    pub dev_score: i64,
    pub workouts_this_week: i64,
    pub tasks_done: i64,
    pub skills_in_progress: i64,
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// XP per local day and kind for events created on or after `since`.
fn daily_totals(
    conn: &Connection,
    user: UserId,
    since: NaiveDate,
) -> Result<(BTreeMap<NaiveDate, i64>, Vec<(NaiveDate, XpKind, i64)>)> {
    let (start, _) = time::local_day_bounds(since);
    let mut stmt = conn.prepare(
        "SELECT created_at, kind, amount FROM xp_events
         WHERE user_id = ?1 AND created_at >= ?2
         ORDER BY created_at",
    )?;
    let rows = stmt.query_map(params![user.0, start as i64], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?))
    })?;

    let mut by_day = BTreeMap::new();
    let mut entries = Vec::new();
    for row in rows {
        let (created_at, kind, amount) = row?;
        let date = time::local_date(created_at as u64);
        *by_day.entry(date).or_insert(0) += amount;
        entries.push((date, XpKind::from_tag(&kind)?, amount));
    }
    Ok((by_day, entries))
}

/// Length of the run of days with XP ending at `today`.
fn current_streak(by_day: &BTreeMap<NaiveDate, i64>, today: NaiveDate) -> u64 {
    let mut streak = 0;
    let mut day = today;
    while streak < STREAK_LOOKBACK_DAYS && by_day.get(&day).copied().unwrap_or(0) > 0 {
        streak += 1;
        day = match day.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }
    streak
}

fn best_streak(days: &[DailyXp]) -> u64 {
    let mut best = 0;
    let mut run = 0;
    for day in days {
        if day.xp > 0 {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// XP history over the last 30 days plus streaks.
pub fn analytics_summary(conn: &Connection, user: UserId, now: u64) -> Result<AnalyticsSummary> {
    progression::ensure_stats(conn, user, now)?;
    let today = time::local_date(now);
    let from = days_before(today, ANALYTICS_WINDOW_DAYS - 1);
    let lookback = days_before(today, STREAK_LOOKBACK_DAYS - 1);

    let (by_day, entries) = daily_totals(conn, user, lookback)?;

    let xp_by_day: Vec<DailyXp> = from
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|date| DailyXp {
            date,
            xp: by_day.get(&date).copied().unwrap_or(0),
        })
        .collect();

    let mut kinds: HashMap<XpKind, i64> = HashMap::new();
    for (date, kind, amount) in entries {
        if date >= from {
            *kinds.entry(kind).or_insert(0) += amount;
        }
    }
    let mut xp_by_kind: Vec<KindXp> = kinds
        .into_iter()
        .map(|(kind, xp)| KindXp { kind, xp })
        .collect();
    xp_by_kind.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.kind.as_tag().cmp(b.kind.as_tag())));

    Ok(AnalyticsSummary {
        from,
        to: today,
        streak_current: current_streak(&by_day, today),
        streak_best_30d: best_streak(&xp_by_day),
        xp_by_day,
        xp_by_kind,
    })
}

/// Hero overview.
pub fn dashboard(conn: &Connection, user: UserId, now: u64) -> Result<Dashboard> {
    let stats = progression::ensure_stats(conn, user, now)?;
    let today = time::local_date(now);
    let monday = days_before(today, u64::from(today.weekday().num_days_from_monday()));

    let counts = progression::achievement_counts(conn, user)?;
    let skills_in_progress: i64 = conn.query_row(
        "SELECT COUNT(*) FROM skills WHERE user_id = ?1 AND status IN ('learning', 'practicing')",
        params![user.0],
        |row| row.get(0),
    )?;

    Ok(Dashboard {
        level: stats.level,
        xp: stats.xp,
        xp_to_next_level: stats.xp_to_next_level,
        rank: stats.rank,
        dev_score: stats.dev_score,
        workouts_this_week: workouts::count_workouts_since(conn, user, monday)?,
        tasks_done: counts.completed_tasks,
        skills_in_progress,
    })
}
