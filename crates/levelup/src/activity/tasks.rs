//! Projects and their tasks. Completing a task credits `difficulty * 50` XP
//! exactly once.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::ledger::{Award, XpKind};
use crate::progression;
use crate::storage::sql_text_enum;

use super::{optional_text, required_text};

pub const XP_PER_DIFFICULTY: i64 = 50;
pub const MAX_DIFFICULTY: i64 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub i64);

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

sql_text_enum! {
    pub enum ProjectStatus as "status" {
        Active => "active",
        Paused => "paused",
        Done => "done",
    }
}

sql_text_enum! {
    pub enum TaskKind as "type" {
        Daily => "daily",
        Main => "main",
        Internship => "internship",
    }
}

sql_text_enum! {
    pub enum TaskStatus as "status" {
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProject {
    pub name: String,
    pub is_commercial: bool,
    pub description: String,
    pub stack: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user: UserId,
    pub name: String,
    pub is_commercial: bool,
    pub description: String,
    pub stack: String,
    pub role: String,
    pub status: ProjectStatus,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    #[serde(rename = "type", default = "default_task_kind")]
    pub kind: TaskKind,
    pub difficulty: i64,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

fn default_task_kind() -> TaskKind {
    TaskKind::Main
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub difficulty: i64,
    pub deadline: Option<NaiveDate>,
    pub notes: String,
    pub completed_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Task {
    pub fn xp_reward(&self) -> i64 {
        task_xp(self.difficulty)
    }
}

pub fn task_xp(difficulty: i64) -> i64 {
    difficulty * XP_PER_DIFFICULTY
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

const PROJECT_COLUMNS: &str =
    "id, user_id, name, is_commercial, description, stack, role, status, created_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId(row.get(0)?),
        user: UserId(row.get(1)?),
        name: row.get(2)?,
        is_commercial: row.get(3)?,
        description: row.get(4)?,
        stack: row.get(5)?,
        role: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get::<_, i64>(8)? as u64,
    })
}

pub fn create_project(
    conn: &Connection,
    user: UserId,
    input: &NewProject,
    now: u64,
) -> Result<Project> {
    let name = required_text("name", &input.name, 200)?;
    let description = optional_text("description", &input.description, 5000)?;
    let stack = optional_text("stack", &input.stack, 200)?;
    let role = optional_text("role", &input.role, 100)?;

    progression::ensure_stats(conn, user, now)?;
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM projects WHERE user_id = ?1 AND name = ?2",
            params![user.0, name],
            |row| row.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(ProgressError::invalid(
            "name",
            format!("project '{name}' already exists"),
        ));
    }

    conn.execute(
        "INSERT INTO projects (user_id, name, is_commercial, description, stack, role, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.0,
            name,
            input.is_commercial,
            description,
            stack,
            role,
            ProjectStatus::Active,
            now as i64
        ],
    )?;
    let project = get_project(conn, user, ProjectId(conn.last_insert_rowid()))?;

    if project.is_commercial {
        progression::recalculate_dev_score(conn, user, now)?;
    }
    log::info!("user {user} created project {} '{}'", project.id, project.name);
    Ok(project)
}

/// Fetch a project owned by `user`. Another user's project is not-found.
pub fn get_project(conn: &Connection, user: UserId, id: ProjectId) -> Result<Project> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id.0, user.0], project_from_row)
        .optional()?
        .ok_or_else(|| ProgressError::NotFound(format!("project {id}")))
}

pub fn list_projects(conn: &Connection, user: UserId) -> Result<Vec<Project>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user.0], project_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

const TASK_COLUMNS: &str = "t.id, t.project_id, t.title, t.kind, t.status, t.difficulty, \
     t.deadline, t.notes, t.completed_at, t.created_at, t.updated_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        title: row.get(2)?,
        kind: row.get(3)?,
        status: row.get(4)?,
        difficulty: row.get(5)?,
        deadline: row.get(6)?,
        notes: row.get(7)?,
        completed_at: row.get::<_, Option<i64>>(8)?.map(|t| t as u64),
        created_at: row.get::<_, i64>(9)? as u64,
        updated_at: row.get::<_, i64>(10)? as u64,
    })
}

pub fn create_task(conn: &Connection, user: UserId, input: &NewTask, now: u64) -> Result<Task> {
    let title = required_text("title", &input.title, 200)?;
    let notes = optional_text("notes", &input.notes, 5000)?;
    if !(1..=MAX_DIFFICULTY).contains(&input.difficulty) {
        return Err(ProgressError::invalid(
            "difficulty",
            format!("must be between 1 and {MAX_DIFFICULTY}"),
        ));
    }
    // Ownership check: tasks are scoped through their project.
    get_project(conn, user, input.project_id)?;

    conn.execute(
        "INSERT INTO tasks (project_id, title, kind, status, difficulty, deadline, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            input.project_id.0,
            title,
            input.kind,
            TaskStatus::Todo,
            input.difficulty,
            input.deadline,
            notes,
            now as i64
        ],
    )?;
    get_task(conn, user, TaskId(conn.last_insert_rowid()))
}

/// Fetch a task whose project belongs to `user`.
pub fn get_task(conn: &Connection, user: UserId, id: TaskId) -> Result<Task> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks t JOIN projects p ON p.id = t.project_id
         WHERE t.id = ?1 AND p.user_id = ?2"
    );
    conn.query_row(&sql, params![id.0, user.0], task_from_row)
        .optional()?
        .ok_or_else(|| ProgressError::NotFound(format!("task {id}")))
}

/// Tasks across all of `user`'s projects, open ones first.
pub fn list_tasks(conn: &Connection, user: UserId) -> Result<Vec<Task>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks t JOIN projects p ON p.id = t.project_id
         WHERE p.user_id = ?1
         ORDER BY t.status = 'done', t.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user.0], task_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Move a task between `todo` and `in_progress`. Use [`complete_task`] to
/// finish it.
pub fn set_task_status(
    conn: &Connection,
    user: UserId,
    id: TaskId,
    status: TaskStatus,
    now: u64,
) -> Result<Task> {
    if status == TaskStatus::Done {
        return complete_task(conn, user, id, now);
    }
    let task = get_task(conn, user, id)?;
    if task.status == TaskStatus::Done {
        return Err(ProgressError::invalid("status", "task is already done"));
    }
    conn.execute(
        "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.0, status, now as i64],
    )?;
    get_task(conn, user, id)
}

/// Mark a task done and credit `difficulty * 50` XP.
///
/// Completing an already-done task returns it unchanged and credits nothing.
pub fn complete_task(conn: &Connection, user: UserId, id: TaskId, now: u64) -> Result<Task> {
    let mut task = get_task(conn, user, id)?;
    if task.status == TaskStatus::Done {
        log::debug!("task {id} already done");
        return Ok(task);
    }

    conn.execute(
        "UPDATE tasks SET status = ?2, completed_at = ?3, updated_at = ?3 WHERE id = ?1",
        params![id.0, TaskStatus::Done, now as i64],
    )?;
    task.status = TaskStatus::Done;
    task.completed_at = Some(now);
    task.updated_at = now;

    let (event, _) = Award::new(user, XpKind::TaskComplete, task.xp_reward())
        .source("task", task.id)
        .metadata(json!({
            "difficulty": task.difficulty,
            "project_id": task.project_id.0,
            "type": task.kind,
        }))
        .apply(conn, now)?;
    if event.is_none() {
        // Zero-XP award still has to count the finished task.
        progression::recalculate_dev_score(conn, user, now)?;
    }

    log::info!("user {user} completed task {id} (+{} XP)", task.xp_reward());
    Ok(task)
}
