//! Skill tree catalog and per-user skills.
//!
//! Tracks and nodes form a shared catalog; a user's [`Skill`] may point at
//! a node, in which case its name and category come from the catalog and
//! its level is clamped to the node's `max_level`. Raising a level credits
//! `2 XP` per level gained, and reaching mastery credits a one-time bonus.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::ledger::{Award, XpKind};
use crate::progression;
use crate::storage::sql_text_enum;

use super::{optional_text, required_text};

pub const MAX_SKILL_LEVEL: i64 = 100;
pub const XP_PER_SKILL_LEVEL: i64 = 2;
pub const SKILL_MASTERED_XP: i64 = 100;
pub const PRACTICING_LEVEL: i64 = 40;
pub const MASTERED_LEVEL: i64 = 80;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTrack {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillNode {
    pub id: i64,
    pub track_id: i64,
    pub code: String,
    pub title: String,
    pub description: String,
    pub max_level: i64,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSkillNode {
    pub track_id: i64,
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_max_level")]
    pub max_level: i64,
    #[serde(default)]
    pub order: i64,
}

fn default_max_level() -> i64 {
    MAX_SKILL_LEVEL
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<SkillTrack> {
    Ok(SkillTrack {
        id: row.get(0)?,
        code: row.get(1)?,
        title: row.get(2)?,
        order: row.get(3)?,
    })
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<SkillNode> {
    Ok(SkillNode {
        id: row.get(0)?,
        track_id: row.get(1)?,
        code: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        max_level: row.get(5)?,
        order: row.get(6)?,
    })
}

fn ensure_code_free(conn: &Connection, table: &str, code: &str) -> Result<()> {
    let sql = format!("SELECT id FROM {table} WHERE code = ?1");
    let taken: Option<i64> = conn
        .query_row(&sql, params![code], |row| row.get(0))
        .optional()?;
    match taken {
        Some(_) => Err(ProgressError::invalid(
            "code",
            format!("code '{code}' is already in use"),
        )),
        None => Ok(()),
    }
}

pub fn create_track(
    conn: &Connection,
    code: &str,
    title: &str,
    order: i64,
    now: u64,
) -> Result<SkillTrack> {
    let code = required_text("code", code, 64)?;
    let title = required_text("title", title, 200)?;
    ensure_code_free(conn, "skill_tracks", &code)?;
    conn.execute(
        "INSERT INTO skill_tracks (code, title, ord, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![code, title, order, now as i64],
    )?;
    get_track(conn, conn.last_insert_rowid())
}

pub fn get_track(conn: &Connection, id: i64) -> Result<SkillTrack> {
    conn.query_row(
        "SELECT id, code, title, ord FROM skill_tracks WHERE id = ?1",
        params![id],
        track_from_row,
    )
    .optional()?
    .ok_or_else(|| ProgressError::NotFound(format!("skill track {id}")))
}

pub fn list_tracks(conn: &Connection) -> Result<Vec<SkillTrack>> {
    let mut stmt = conn.prepare("SELECT id, code, title, ord FROM skill_tracks ORDER BY ord, id")?;
    let rows = stmt.query_map([], track_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn create_node(conn: &Connection, input: &NewSkillNode) -> Result<SkillNode> {
    let code = required_text("code", &input.code, 64)?;
    let title = required_text("title", &input.title, 200)?;
    let description = optional_text("description", &input.description, 5000)?;
    if !(1..=MAX_SKILL_LEVEL).contains(&input.max_level) {
        return Err(ProgressError::invalid(
            "max_level",
            format!("must be between 1 and {MAX_SKILL_LEVEL}"),
        ));
    }
    get_track(conn, input.track_id)?;
    ensure_code_free(conn, "skill_nodes", &code)?;

    conn.execute(
        "INSERT INTO skill_nodes (track_id, code, title, description, max_level, ord)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![input.track_id, code, title, description, input.max_level, input.order],
    )?;
    get_node(conn, conn.last_insert_rowid())
}

pub fn get_node(conn: &Connection, id: i64) -> Result<SkillNode> {
    conn.query_row(
        "SELECT id, track_id, code, title, description, max_level, ord FROM skill_nodes WHERE id = ?1",
        params![id],
        node_from_row,
    )
    .optional()?
    .ok_or_else(|| ProgressError::NotFound(format!("skill node {id}")))
}

pub fn list_nodes(conn: &Connection, track_id: i64) -> Result<Vec<SkillNode>> {
    let mut stmt = conn.prepare(
        "SELECT id, track_id, code, title, description, max_level, ord
         FROM skill_nodes WHERE track_id = ?1 ORDER BY ord, id",
    )?;
    let rows = stmt.query_map(params![track_id], node_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// ---------------------------------------------------------------------------
// User skills
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillId(pub i64);

impl std::fmt::Display for SkillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

sql_text_enum! {
    pub enum SkillStatus as "status" {
        Learning => "learning",
        Practicing => "practicing",
        Mastered => "mastered",
    }
}

impl SkillStatus {
    pub fn for_level(level: i64) -> Self {
        if level >= MASTERED_LEVEL {
            Self::Mastered
        } else if level >= PRACTICING_LEVEL {
            Self::Practicing
        } else {
            Self::Learning
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub user: UserId,
    pub node_id: Option<i64>,
    pub category: String,
    pub name: String,
    pub level: i64,
    pub mastery_xp: i64,
    pub status: SkillStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewSkill {
    /// Ignored when `node_id` is set.
    pub name: String,
    pub category: String,
    pub level: i64,
    pub node_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub level: Option<i64>,
}

/// Result of a skill update: the saved skill and the XP it earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub skill: Skill,
    pub xp_awarded: i64,
}

const SKILL_COLUMNS: &str =
    "id, user_id, node_id, category, name, level, mastery_xp, status, created_at, updated_at";

fn skill_from_row(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: SkillId(row.get(0)?),
        user: UserId(row.get(1)?),
        node_id: row.get(2)?,
        category: row.get(3)?,
        name: row.get(4)?,
        level: row.get(5)?,
        mastery_xp: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get::<_, i64>(8)? as u64,
        updated_at: row.get::<_, i64>(9)? as u64,
    })
}

fn validate_level(level: i64) -> Result<i64> {
    if !(0..=MAX_SKILL_LEVEL).contains(&level) {
        return Err(ProgressError::invalid(
            "level",
            format!("must be between 0 and {MAX_SKILL_LEVEL}"),
        ));
    }
    Ok(level)
}

fn ensure_name_free(
    conn: &Connection,
    user: UserId,
    category: &str,
    name: &str,
    except: Option<SkillId>,
) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM skills WHERE user_id = ?1 AND category = ?2 AND name = ?3",
            params![user.0, category, name],
            |row| row.get(0),
        )
        .optional()?;
    match existing {
        Some(id) if Some(SkillId(id)) != except => Err(ProgressError::invalid(
            "name",
            format!("skill '{name}' already exists in '{category}'"),
        )),
        _ => Ok(()),
    }
}

/// Create a skill. Creation itself earns no XP.
pub fn create_skill(conn: &Connection, user: UserId, input: &NewSkill, now: u64) -> Result<Skill> {
    let mut level = validate_level(input.level)?;
    let (name, category) = match input.node_id {
        Some(node_id) => {
            let node = get_node(conn, node_id)?;
            let track = get_track(conn, node.track_id)?;
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT id FROM skills WHERE user_id = ?1 AND node_id = ?2",
                    params![user.0, node_id],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(ProgressError::invalid(
                    "node_id",
                    format!("skill for node '{}' already exists", node.code),
                ));
            }
            level = level.min(node.max_level);
            (node.title, track.title)
        }
        None => (
            required_text("name", &input.name, 200)?,
            optional_text("category", &input.category, 100)?,
        ),
    };

    progression::ensure_stats(conn, user, now)?;
    ensure_name_free(conn, user, &category, &name, None)?;

    conn.execute(
        "INSERT INTO skills (user_id, node_id, category, name, level, mastery_xp, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?7)",
        params![
            user.0,
            input.node_id,
            category,
            name,
            level,
            SkillStatus::for_level(level),
            now as i64
        ],
    )?;
    let skill = get_skill(conn, user, SkillId(conn.last_insert_rowid()))?;
    progression::recalculate_dev_score(conn, user, now)?;

    log::info!("user {user} added skill {} '{}' at level {}", skill.id, skill.name, skill.level);
    Ok(skill)
}

pub fn get_skill(conn: &Connection, user: UserId, id: SkillId) -> Result<Skill> {
    let sql = format!("SELECT {SKILL_COLUMNS} FROM skills WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id.0, user.0], skill_from_row)
        .optional()?
        .ok_or_else(|| ProgressError::NotFound(format!("skill {id}")))
}

pub fn list_skills(conn: &Connection, user: UserId) -> Result<Vec<Skill>> {
    let sql = format!(
        "SELECT {SKILL_COLUMNS} FROM skills WHERE user_id = ?1 ORDER BY category, name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user.0], skill_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Update a skill and credit XP for progress.
///
/// - level increase: `(after - before) * 2` XP, keyed by the exact
///   transition so replaying the same update credits nothing;
/// - first transition into `mastered`: a one-time 100 XP bonus.
///
/// A level drop is saved but earns nothing.
pub fn update_skill(
    conn: &Connection,
    user: UserId,
    id: SkillId,
    update: &SkillUpdate,
    now: u64,
) -> Result<SkillProgress> {
    let mut skill = get_skill(conn, user, id)?;
    let before_level = skill.level;
    let before_status = skill.status;

    if skill.node_id.is_none() {
        if let Some(name) = &update.name {
            skill.name = required_text("name", name, 200)?;
        }
        if let Some(category) = &update.category {
            skill.category = optional_text("category", category, 100)?;
        }
        ensure_name_free(conn, user, &skill.category, &skill.name, Some(id))?;
    }
    if let Some(level) = update.level {
        let cap = match skill.node_id {
            Some(node_id) => get_node(conn, node_id)?.max_level,
            None => MAX_SKILL_LEVEL,
        };
        skill.level = validate_level(level)?.min(cap);
    }
    skill.status = SkillStatus::for_level(skill.level);

    let gained = skill.level - before_level;
    let level_up_xp = gained.max(0) * XP_PER_SKILL_LEVEL;
    skill.mastery_xp += level_up_xp;
    skill.updated_at = now;

    conn.execute(
        "UPDATE skills SET category = ?2, name = ?3, level = ?4, mastery_xp = ?5, status = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            id.0,
            skill.category,
            skill.name,
            skill.level,
            skill.mastery_xp,
            skill.status,
            now as i64
        ],
    )?;

    let mut xp_awarded = 0;
    if level_up_xp > 0 {
        xp_awarded += Award::new(user, XpKind::SkillLevelUp, level_up_xp)
            .source("skill_level_up", format!("{id}:{before_level}->{}", skill.level))
            .metadata(json!({
                "skill_id": id.0,
                "before_level": before_level,
                "after_level": skill.level,
                "name": skill.name,
                "category": skill.category,
            }))
            .credit(conn, now)?;
    }
    if skill.status == SkillStatus::Mastered && before_status != SkillStatus::Mastered {
        xp_awarded += Award::new(user, XpKind::SkillMastered, SKILL_MASTERED_XP)
            .source("skill_mastered", id)
            .metadata(json!({ "skill_id": id.0, "name": skill.name, "category": skill.category }))
            .credit(conn, now)?;
        log::info!("user {user} mastered skill {id} '{}'", skill.name);
    }

    // Average skill level feeds the dev score even when no XP moved.
    progression::recalculate_dev_score(conn, user, now)?;

    Ok(SkillProgress { skill, xp_awarded })
}
