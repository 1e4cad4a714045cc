//! User records.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};

/// Database identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: u64,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        created_at: row.get::<_, i64>(2)? as u64,
    })
}

fn normalize(username: &str) -> Result<String> {
    let name = username.trim();
    if name.is_empty() {
        return Err(ProgressError::invalid("username", "must not be empty"));
    }
    if name.len() > 150 {
        return Err(ProgressError::invalid("username", "at most 150 characters"));
    }
    Ok(name.to_string())
}

/// Create a new user. Usernames are unique.
pub fn create_user(conn: &Connection, username: &str, now: u64) -> Result<User> {
    let name = normalize(username)?;
    if find_user(conn, &name)?.is_some() {
        return Err(ProgressError::invalid("username", "already taken"));
    }
    conn.execute(
        "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
        params![name, now as i64],
    )?;
    Ok(User {
        id: UserId(conn.last_insert_rowid()),
        username: name,
        created_at: now,
    })
}

pub fn find_user(conn: &Connection, username: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, created_at FROM users WHERE username = ?1",
            params![username.trim()],
            from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, id: UserId) -> Result<User> {
    conn.query_row(
        "SELECT id, username, created_at FROM users WHERE id = ?1",
        params![id.0],
        from_row,
    )
    .optional()?
    .ok_or_else(|| ProgressError::NotFound(format!("user {id}")))
}

pub fn get_or_create_user(conn: &Connection, username: &str, now: u64) -> Result<User> {
    match find_user(conn, username)? {
        Some(user) => Ok(user),
        None => create_user(conn, username, now),
    }
}
