//! Level curve and rank table.

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};

/// XP step of the triangular curve: reaching level L costs
/// `100 * (1 + 2 + ... + (L-1))` in total.
pub const XP_PER_LEVEL_STEP: i64 = 100;

/// Unallocated stat points granted per level gained.
pub const STAT_POINTS_PER_LEVEL: i64 = 5;

/// Total XP required to *be* at `level`.
///
/// Level 1 -> 0, level 2 -> 100, level 3 -> 300, level 4 -> 600.
pub fn xp_required_to_reach_level(level: i64) -> i64 {
    if level <= 1 {
        return 0;
    }
    ((level - 1).saturating_mul(level) / 2).saturating_mul(XP_PER_LEVEL_STEP)
}

/// Display value stored as `xp_to_next_level`. This is a fixed function of
/// the level, not the XP still missing to the next threshold.
pub fn xp_to_next_level(level: i64) -> i64 {
    level * XP_PER_LEVEL_STEP
}

/// Advance `level` while `xp` covers the next threshold. Handles multi-level
/// jumps from a single large award.
pub fn level_up(mut level: i64, xp: i64) -> i64 {
    level = level.max(1);
    loop {
        let next = xp_required_to_reach_level(level + 1);
        if next == i64::MAX || xp < next {
            break;
        }
        level += 1;
    }
    level
}

/// Largest level whose cumulative requirement is covered by `xp`.
pub fn level_for_xp(xp: i64) -> i64 {
    level_up(1, xp)
}

/// Developer rank, ordered `E < D < C < B < A < S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    E,
    D,
    C,
    B,
    A,
    S,
}

/// Minimum dev score per rank, scanned from the top.
pub const RANK_THRESHOLDS: [(Rank, i64); 6] = [
    (Rank::S, 10_000),
    (Rank::A, 6_000),
    (Rank::B, 3_000),
    (Rank::C, 1_500),
    (Rank::D, 500),
    (Rank::E, 0),
];

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E => "E",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
        }
    }

    /// Human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::E => "Novice",
            Self::D => "Junior",
            Self::C => "Junior+",
            Self::B => "Middle",
            Self::A => "Middle+",
            Self::S => "Senior",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "E" => Ok(Self::E),
            "D" => Ok(Self::D),
            "C" => Ok(Self::C),
            "B" => Ok(Self::B),
            "A" => Ok(Self::A),
            "S" => Ok(Self::S),
            other => Err(ProgressError::invalid("rank", format!("unknown rank '{other}'"))),
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl rusqlite::ToSql for Rank {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
    }
}

impl rusqlite::types::FromSql for Rank {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        Self::parse(value.as_str()?).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
    }
}

pub fn rank_for_dev_score(dev_score: i64) -> Rank {
    RANK_THRESHOLDS
        .iter()
        .find(|(_, threshold)| dev_score >= *threshold)
        .map(|(rank, _)| *rank)
        .unwrap_or(Rank::E)
}
