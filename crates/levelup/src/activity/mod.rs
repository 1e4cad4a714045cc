//! XP producers: workouts, learning logs, projects and tasks, skills, and
//! focus sessions.
//!
//! Each producer writes its own record and credits XP through
//! [`Award`](crate::ledger::Award) with a source key, so a retried request
//! never credits twice.

pub mod focus;
pub mod learning;
pub mod skills;
pub mod tasks;
pub mod workouts;

pub use focus::{FocusKind, FocusRules, FocusSession, SessionId};
pub use learning::{LearningLog, NewLearningLog, LEARNING_LOG_XP};
pub use skills::{
    NewSkill, NewSkillNode, Skill, SkillId, SkillNode, SkillProgress, SkillStatus, SkillTrack,
    SkillUpdate,
};
pub use tasks::{NewProject, NewTask, Project, ProjectId, ProjectStatus, Task, TaskId, TaskKind, TaskStatus};
pub use workouts::{NewWorkout, Workout};

use crate::error::{ProgressError, Result};

/// Trim `value` and require it to be non-empty and at most `max_chars`.
pub(crate) fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProgressError::invalid(field, "this field may not be blank"));
    }
    optional_text(field, value, max_chars)
}

/// Trim `value` and cap its length; empty is allowed.
pub(crate) fn optional_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let value = value.trim();
    if value.chars().count() > max_chars {
        return Err(ProgressError::invalid(
            field,
            format!("ensure this field has no more than {max_chars} characters"),
        ));
    }
    Ok(value.to_string())
}
