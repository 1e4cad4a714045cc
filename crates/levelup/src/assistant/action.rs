//! The closed set of actions the assistant may propose.
//!
//! A proposal travels as `{name, args}` JSON: inside a fenced ```` ```action ````
//! block of the model's reply, and inside signed action tokens. It only
//! becomes an [`AssistantAction`] after its name and arguments validate.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::{FocusKind, TaskId};
use crate::error::{ProgressError, Result};

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

/// An unvalidated `{name, args}` directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProposal {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

// ---------------------------------------------------------------------------
// Typed actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BossAttackArgs {
    pub max_events: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FocusStartArgs {
    pub kind: FocusKind,
    pub note: String,
    pub skill_node_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FocusStopArgs {
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCompleteArgs {
    pub task_id: TaskId,
}

/// Every operation the assistant can trigger, with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantAction {
    HeroStats,
    BossStatus,
    BossAttack(BossAttackArgs),
    BossNext,
    FocusStart(FocusStartArgs),
    FocusStop(FocusStopArgs),
    TaskComplete(TaskCompleteArgs),
}

fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(args).map_err(|e| ProgressError::invalid("args", e.to_string()))
}

fn to_args<T: Serialize>(args: &T) -> Value {
    serde_json::to_value(args).unwrap_or(Value::Null)
}

impl AssistantAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::HeroStats => "hero_stats",
            Self::BossStatus => "boss_status",
            Self::BossAttack(_) => "boss_attack",
            Self::BossNext => "boss_next",
            Self::FocusStart(_) => "focus_start",
            Self::FocusStop(_) => "focus_stop",
            Self::TaskComplete(_) => "task_complete",
        }
    }

    /// Validate a proposal. An unknown name or malformed arguments is a
    /// validation error.
    pub fn from_proposal(proposal: &ActionProposal) -> Result<Self> {
        let args = &proposal.args;
        Ok(match proposal.name.trim() {
            "hero_stats" => Self::HeroStats,
            "boss_status" => Self::BossStatus,
            "boss_attack" => Self::BossAttack(parse_args(args)?),
            "boss_next" => Self::BossNext,
            "focus_start" => Self::FocusStart(parse_args(args)?),
            "focus_stop" => Self::FocusStop(parse_args(args)?),
            "task_complete" => Self::TaskComplete(parse_args(args)?),
            other => {
                return Err(ProgressError::invalid(
                    "name",
                    format!("unknown action '{other}'"),
                ))
            }
        })
    }

    pub fn to_proposal(&self) -> ActionProposal {
        let args = match self {
            Self::HeroStats | Self::BossStatus | Self::BossNext => {
                Value::Object(Default::default())
            }
            Self::BossAttack(args) => to_args(args),
            Self::FocusStart(args) => to_args(args),
            Self::FocusStop(args) => to_args(args),
            Self::TaskComplete(args) => to_args(args),
        };
        ActionProposal {
            name: self.name().to_string(),
            args,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Name and description of an allowed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
}

const CATALOG: [ActionSpec; 7] = [
    ActionSpec {
        name: "hero_stats",
        description: "Show level, XP, rank and dev score.",
    },
    ActionSpec {
        name: "boss_status",
        description: "Show the current boss and its HP.",
    },
    ActionSpec {
        name: "boss_attack",
        description: "Spend new XP as damage against the boss. args: {\"max_events\": 200}",
    },
    ActionSpec {
        name: "boss_next",
        description: "Skip the current boss and summon the next one.",
    },
    ActionSpec {
        name: "focus_start",
        description: "Start a focus session. args: {\"kind\": \"coding|learning|debugging|reading|review|interview\", \"note\": \"\", \"skill_node_id\": null}",
    },
    ActionSpec {
        name: "focus_stop",
        description: "Stop the running focus session and collect XP. args: {\"source_url\": \"\"}",
    },
    ActionSpec {
        name: "task_complete",
        description: "Mark a task as done. args: {\"task_id\": 1}",
    },
];

pub fn action_catalog() -> &'static [ActionSpec] {
    &CATALOG
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

static ACTION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)```action\s*(\{[\s\S]*?\})\s*```").expect("action block pattern is valid")
});

/// Split a model reply into display text and an optional proposal.
///
/// The first fenced `action` block is removed from the text. A block whose
/// JSON does not parse, or lacks a string `name`, yields no proposal.
pub fn extract_action(text: &str) -> (String, Option<ActionProposal>) {
    let Some(captures) = ACTION_BLOCK.captures(text) else {
        return (text.trim().to_string(), None);
    };
    let (Some(block), Some(json)) = (captures.get(0), captures.get(1)) else {
        return (text.trim().to_string(), None);
    };

    let mut clean = String::with_capacity(text.len());
    clean.push_str(&text[..block.start()]);
    clean.push_str(&text[block.end()..]);

    let proposal = match serde_json::from_str::<ActionProposal>(json.as_str()) {
        Ok(p) if !p.name.trim().is_empty() => Some(p),
        Ok(_) => None,
        Err(e) => {
            log::debug!("ignoring malformed action block: {e}");
            None
        }
    };
    (clean.trim().to_string(), proposal)
}
