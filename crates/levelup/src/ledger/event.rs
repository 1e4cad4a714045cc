//! XP events: the immutable entries of the ledger.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};
use crate::identity::UserId;

/// Database identifier of an XP event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub i64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What earned the XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpKind {
    Workout,
    TaskComplete,
    SkillLevelUp,
    SkillMastered,
    LearningLog,
    FocusSession,
    BossDefeat,
    GithubCommit,
    GithubPr,
}

impl XpKind {
    pub const ALL: [XpKind; 9] = [
        Self::Workout,
        Self::TaskComplete,
        Self::SkillLevelUp,
        Self::SkillMastered,
        Self::LearningLog,
        Self::FocusSession,
        Self::BossDefeat,
        Self::GithubCommit,
        Self::GithubPr,
    ];

    /// Stable string tag stored in the database.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Workout => "workout",
            Self::TaskComplete => "task_complete",
            Self::SkillLevelUp => "skill_level_up",
            Self::SkillMastered => "skill_mastered",
            Self::LearningLog => "learning_log",
            Self::FocusSession => "focus_session",
            Self::BossDefeat => "boss_defeat",
            Self::GithubCommit => "github_commit",
            Self::GithubPr => "github_pr",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_tag() == tag)
            .ok_or_else(|| ProgressError::invalid("kind", format!("unknown XP kind '{tag}'")))
    }
}

impl std::fmt::Display for XpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_tag())
    }
}

/// A ledger entry. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpEvent {
    pub id: EventId,
    pub user: UserId,
    pub kind: XpKind,
    pub amount: i64,
    /// Idempotence key, together with `source_id`. Empty for events that
    /// are never deduplicated.
    pub source_type: String,
    pub source_id: String,
    pub source_url: String,
    pub metadata: serde_json::Value,
    pub occurred_at: Option<u64>,
    pub created_at: u64,
}

impl XpEvent {
    /// Whether this event carries a deduplication key.
    pub fn has_source_key(&self) -> bool {
        !self.source_type.is_empty() && !self.source_id.is_empty()
    }
}

pub(crate) const EVENT_COLUMNS: &str =
    "id, user_id, kind, amount, source_type, source_id, source_url, metadata, occurred_at, created_at";

/// Raw row; kind and metadata are decoded afterwards so their errors can
/// be reported as ours rather than as rusqlite conversion errors.
pub(crate) struct EventRow {
    id: i64,
    user_id: i64,
    kind: String,
    amount: i64,
    source_type: String,
    source_id: String,
    source_url: String,
    metadata: String,
    occurred_at: Option<i64>,
    created_at: i64,
}

impl EventRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            amount: row.get(3)?,
            source_type: row.get(4)?,
            source_id: row.get(5)?,
            source_url: row.get(6)?,
            metadata: row.get(7)?,
            occurred_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    pub(crate) fn decode(self) -> Result<XpEvent> {
        Ok(XpEvent {
            id: EventId(self.id),
            user: UserId(self.user_id),
            kind: XpKind::from_tag(&self.kind)?,
            amount: self.amount,
            source_type: self.source_type,
            source_id: self.source_id,
            source_url: self.source_url,
            metadata: serde_json::from_str(&self.metadata)?,
            occurred_at: self.occurred_at.map(|t| t as u64),
            created_at: self.created_at as u64,
        })
    }
}
