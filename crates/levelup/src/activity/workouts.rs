//! Workouts. XP is `duration_minutes * intensity`.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::ledger::{Award, XpKind};
use crate::progression;
use crate::time;

use super::{optional_text, required_text};

pub const MAX_WORKOUT_MINUTES: i64 = 24 * 60;
pub const MAX_INTENSITY: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkout {
    #[serde(rename = "type")]
    pub kind: String,
    pub duration_minutes: i64,
    pub intensity: i64,
    /// Defaults to today (server-local).
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub user: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration_minutes: i64,
    pub intensity: i64,
    pub date: NaiveDate,
    pub comment: String,
    pub created_at: u64,
}

impl Workout {
    pub fn xp(&self) -> i64 {
        workout_xp(self.duration_minutes, self.intensity)
    }
}

pub fn workout_xp(duration_minutes: i64, intensity: i64) -> i64 {
    duration_minutes * intensity
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Workout> {
    Ok(Workout {
        id: row.get(0)?,
        user: UserId(row.get(1)?),
        kind: row.get(2)?,
        duration_minutes: row.get(3)?,
        intensity: row.get(4)?,
        date: row.get(5)?,
        comment: row.get(6)?,
        created_at: row.get::<_, i64>(7)? as u64,
    })
}

/// Log a workout and credit its XP (keyed by the workout id).
pub fn create_workout(
    conn: &Connection,
    user: UserId,
    input: &NewWorkout,
    now: u64,
) -> Result<Workout> {
    let kind = required_text("type", &input.kind, 64)?;
    let comment = optional_text("comment", &input.comment, 2000)?;
    if !(1..=MAX_WORKOUT_MINUTES).contains(&input.duration_minutes) {
        return Err(ProgressError::invalid(
            "duration_minutes",
            format!("must be between 1 and {MAX_WORKOUT_MINUTES}"),
        ));
    }
    if !(1..=MAX_INTENSITY).contains(&input.intensity) {
        return Err(ProgressError::invalid(
            "intensity",
            format!("must be between 1 and {MAX_INTENSITY}"),
        ));
    }
    let date = input.date.unwrap_or_else(|| time::local_date(now));

    progression::ensure_stats(conn, user, now)?;
    conn.execute(
        "INSERT INTO workouts (user_id, kind, duration_minutes, intensity, date, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.0,
            kind,
            input.duration_minutes,
            input.intensity,
            date,
            comment,
            now as i64
        ],
    )?;

    let workout = Workout {
        id: conn.last_insert_rowid(),
        user,
        kind,
        duration_minutes: input.duration_minutes,
        intensity: input.intensity,
        date,
        comment,
        created_at: now,
    };

    Award::new(user, XpKind::Workout, workout.xp())
        .source("workout", workout.id)
        .metadata(json!({
            "duration": workout.duration_minutes,
            "intensity": workout.intensity,
            "date": workout.date.to_string(),
            "type": workout.kind,
        }))
        .apply(conn, now)?;

    log::info!(
        "user {user} logged workout {} ({} min x{}, +{} XP)",
        workout.id,
        workout.duration_minutes,
        workout.intensity,
        workout.xp()
    );
    Ok(workout)
}

/// Workouts dated on or after `since`, newest first.
pub fn list_workouts(conn: &Connection, user: UserId, since: NaiveDate) -> Result<Vec<Workout>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, duration_minutes, intensity, date, comment, created_at
         FROM workouts WHERE user_id = ?1 AND date >= ?2
         ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![user.0, since], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn count_workouts_since(conn: &Connection, user: UserId, since: NaiveDate) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM workouts WHERE user_id = ?1 AND date >= ?2",
        params![user.0, since],
        |row| row.get(0),
    )?;
    Ok(count)
}
