//! Per-user assistant memory and persona.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::activity::optional_text;
use crate::error::Result;
use crate::identity::UserId;
use crate::progression;

pub const DEFAULT_PERSONA: &str = "You are the System: a terse, encouraging game master who \
     treats the user's work and training as a hunter's progression. Answer briefly.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantProfile {
    pub user: UserId,
    pub preferred_name: String,
    pub how_to_address: String,
    pub about_me: String,
    /// Empty means [`DEFAULT_PERSONA`].
    pub assistant_persona: String,
    pub updated_at: u64,
}

impl AssistantProfile {
    pub fn persona(&self) -> &str {
        if self.assistant_persona.trim().is_empty() {
            DEFAULT_PERSONA
        } else {
            &self.assistant_persona
        }
    }
}

/// Fields to change; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub preferred_name: Option<String>,
    pub how_to_address: Option<String>,
    pub about_me: Option<String>,
    pub assistant_persona: Option<String>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<AssistantProfile> {
    Ok(AssistantProfile {
        user: UserId(row.get(0)?),
        preferred_name: row.get(1)?,
        how_to_address: row.get(2)?,
        about_me: row.get(3)?,
        assistant_persona: row.get(4)?,
        updated_at: row.get::<_, i64>(5)? as u64,
    })
}

fn load(conn: &Connection, user: UserId) -> Result<Option<AssistantProfile>> {
    Ok(conn
        .query_row(
            "SELECT user_id, preferred_name, how_to_address, about_me, assistant_persona, updated_at
             FROM assistant_profiles WHERE user_id = ?1",
            params![user.0],
            from_row,
        )
        .optional()?)
}

/// Get the profile, creating an empty one on first access.
pub fn get_profile(conn: &Connection, user: UserId, now: u64) -> Result<AssistantProfile> {
    progression::ensure_stats(conn, user, now)?;
    if let Some(profile) = load(conn, user)? {
        return Ok(profile);
    }
    conn.execute(
        "INSERT OR IGNORE INTO assistant_profiles (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![user.0, now as i64],
    )?;
    Ok(AssistantProfile {
        user,
        preferred_name: String::new(),
        how_to_address: String::new(),
        about_me: String::new(),
        assistant_persona: String::new(),
        updated_at: now,
    })
}

pub fn update_profile(
    conn: &Connection,
    user: UserId,
    update: &ProfileUpdate,
    now: u64,
) -> Result<AssistantProfile> {
    let mut profile = get_profile(conn, user, now)?;
    if let Some(v) = &update.preferred_name {
        profile.preferred_name = optional_text("preferred_name", v, 100)?;
    }
    if let Some(v) = &update.how_to_address {
        profile.how_to_address = optional_text("how_to_address", v, 200)?;
    }
    if let Some(v) = &update.about_me {
        profile.about_me = optional_text("about_me", v, 4000)?;
    }
    if let Some(v) = &update.assistant_persona {
        profile.assistant_persona = optional_text("assistant_persona", v, 4000)?;
    }
    profile.updated_at = now;

    conn.execute(
        "UPDATE assistant_profiles
         SET preferred_name = ?2, how_to_address = ?3, about_me = ?4, assistant_persona = ?5, updated_at = ?6
         WHERE user_id = ?1",
        params![
            user.0,
            profile.preferred_name,
            profile.how_to_address,
            profile.about_me,
            profile.assistant_persona,
            now as i64
        ],
    )?;
    Ok(profile)
}
