//! LevelUp: progression engine for a gamified productivity tracker.
//!
//! Every productive act (a workout, a finished task, a focus session, a
//! skill level-up) becomes an immutable XP event in a per-user ledger.
//! Stats, levels, dev score and rank are projections of that ledger.
//! Ledger events are also the ammunition for boss raids, and a local
//! assistant can propose signed actions that the user confirms.

pub mod activity;
pub mod analytics;
pub mod assistant;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod progression;
pub mod raid;
pub mod storage;
pub mod time;

// Re-export primary types
pub use config::Config;
pub use engine::Engine;
pub use error::{ErrorEnvelope, ProgressError, Result};
pub use identity::{User, UserId};
pub use ledger::{Award, EventId, XpEvent, XpKind};
pub use progression::{DevScoreBreakdown, Rank, StatAllocation, UserStats};
pub use storage::Store;
pub use time::{Clock, ManualClock, SystemClock};

// Re-export producer types
pub use activity::{
    FocusKind, FocusRules, FocusSession, LearningLog, NewLearningLog, NewProject, NewSkill,
    NewSkillNode, NewTask, NewWorkout, Project, ProjectId, ProjectStatus, SessionId, Skill,
    SkillId, SkillNode, SkillProgress, SkillStatus, SkillTrack, SkillUpdate, Task, TaskId,
    TaskKind, TaskStatus, Workout,
};

// Re-export raid and read-model types
pub use analytics::{AnalyticsSummary, Dashboard, DailyXp, KindXp};
pub use raid::{AttackOutcome, BossId, BossRun, BossStatus};

// Re-export assistant types
pub use assistant::{
    ActResult, ActionProposal, AssistantAction, AssistantProfile, ChatMessage, ChatReply,
    ChatRole, CompletionProvider, DisabledProvider, HistoryEntry, ProfileUpdate,
};
#[cfg(feature = "ollama")]
pub use assistant::OllamaProvider;
