//! Dev score: XP blended with achievements from the projects and skills
//! read models.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::UserId;

use super::level::{rank_for_dev_score, Rank};
use super::stats::{self, UserStats};

pub const SKILL_LEVEL_WEIGHT: i64 = 5;
pub const COMPLETED_TASK_WEIGHT: i64 = 20;
pub const MASTERED_SKILL_WEIGHT: i64 = 100;
pub const COMMERCIAL_PROJECT_WEIGHT: i64 = 300;

/// Live counts from the collaborating projects/skills tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementCounts {
    /// Mean skill level, truncated; 0 without skills.
    pub avg_skill_level: i64,
    pub completed_tasks: i64,
    pub mastered_skills: i64,
    pub commercial_projects: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevScoreBreakdown {
    pub total_xp: i64,
    pub avg_skill_level: i64,
    pub completed_tasks: i64,
    pub mastered_skills: i64,
    pub commercial_projects: i64,
    pub dev_score: i64,
    pub rank: Rank,
}

pub fn achievement_counts(conn: &Connection, user: UserId) -> Result<AchievementCounts> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(level) FROM skills WHERE user_id = ?1",
        params![user.0],
        |row| row.get(0),
    )?;
    let completed_tasks: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
         WHERE p.user_id = ?1 AND t.status = 'done'",
        params![user.0],
        |row| row.get(0),
    )?;
    let mastered_skills: i64 = conn.query_row(
        "SELECT COUNT(*) FROM skills WHERE user_id = ?1 AND status = 'mastered'",
        params![user.0],
        |row| row.get(0),
    )?;
    let commercial_projects: i64 = conn.query_row(
        "SELECT COUNT(*) FROM projects WHERE user_id = ?1 AND is_commercial = 1",
        params![user.0],
        |row| row.get(0),
    )?;

    Ok(AchievementCounts {
        avg_skill_level: avg.map(|v| v.trunc() as i64).unwrap_or(0),
        completed_tasks,
        mastered_skills,
        commercial_projects,
    })
}

pub fn dev_score(xp: i64, counts: &AchievementCounts) -> i64 {
    xp + counts.avg_skill_level * SKILL_LEVEL_WEIGHT
        + counts.completed_tasks * COMPLETED_TASK_WEIGHT
        + counts.mastered_skills * MASTERED_SKILL_WEIGHT
        + counts.commercial_projects * COMMERCIAL_PROJECT_WEIGHT
}

/// Compute the breakdown for an in-memory stats value without saving.
pub(crate) fn breakdown_for(conn: &Connection, stats: &UserStats) -> Result<DevScoreBreakdown> {
    let counts = achievement_counts(conn, stats.user)?;
    let score = dev_score(stats.xp, &counts);
    Ok(DevScoreBreakdown {
        total_xp: stats.xp,
        avg_skill_level: counts.avg_skill_level,
        completed_tasks: counts.completed_tasks,
        mastered_skills: counts.mastered_skills,
        commercial_projects: counts.commercial_projects,
        dev_score: score,
        rank: rank_for_dev_score(score),
    })
}

/// Recompute and persist dev score and rank from live counts.
pub fn recalculate_dev_score(conn: &Connection, user: UserId, now: u64) -> Result<DevScoreBreakdown> {
    let mut current = stats::ensure_stats(conn, user, now)?;
    let breakdown = breakdown_for(conn, &current)?;
    stats::store_score(conn, &mut current, breakdown.dev_score, breakdown.rank, now)?;
    Ok(breakdown)
}
