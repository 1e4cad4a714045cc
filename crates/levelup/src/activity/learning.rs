//! Learning logs: a flat 25 XP per entry.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::identity::UserId;
use crate::ledger::{Award, XpKind};
use crate::progression;
use crate::time;

use super::{optional_text, required_text};

pub const LEARNING_LOG_XP: i64 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLearningLog {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningLog {
    pub id: i64,
    pub user: UserId,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub created_at: u64,
}

pub fn create_learning_log(
    conn: &Connection,
    user: UserId,
    input: &NewLearningLog,
    now: u64,
) -> Result<LearningLog> {
    let title = required_text("title", &input.title, 200)?;
    let description = optional_text("description", &input.description, 5000)?;
    let date = input.date.unwrap_or_else(|| time::local_date(now));

    progression::ensure_stats(conn, user, now)?;
    conn.execute(
        "INSERT INTO learning_logs (user_id, title, description, date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.0, title, description, date, now as i64],
    )?;
    let entry = LearningLog {
        id: conn.last_insert_rowid(),
        user,
        title,
        description,
        date,
        created_at: now,
    };

    Award::new(user, XpKind::LearningLog, LEARNING_LOG_XP)
        .source("learning_log", entry.id)
        .metadata(json!({ "date": entry.date.to_string(), "title": entry.title }))
        .apply(conn, now)?;

    log::info!("user {user} logged learning '{}'", entry.title);
    Ok(entry)
}
