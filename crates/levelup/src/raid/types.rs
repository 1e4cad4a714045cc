//! Data structures for boss runs.

use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::progression::Rank;
use crate::storage::sql_text_enum;

/// Upper bound on events consumed by one attack.
pub const MAX_ATTACK_EVENTS: usize = 500;
pub const DEFAULT_ATTACK_EVENTS: usize = 200;

pub const DEFEAT_BONUS_BASE: i64 = 200;
/// The defeat bonus adds `hp_max / DEFEAT_BONUS_HP_DIVISOR`.
pub const DEFEAT_BONUS_HP_DIVISOR: i64 = 10;

// ---------------------------------------------------------------------------
// Boss run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BossId(pub i64);

impl std::fmt::Display for BossId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

sql_text_enum! {
    pub enum BossStatus as "status" {
        Active => "active",
        Defeated => "defeated",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossRun {
    pub id: BossId,
    pub user: UserId,
    pub name: String,
    /// Display tier, fixed when the boss is generated.
    pub rank: Rank,
    pub hp_max: i64,
    pub hp_current: i64,
    pub status: BossStatus,
    pub started_at: u64,
    pub defeated_at: Option<u64>,
}

impl BossRun {
    pub fn is_active(&self) -> bool {
        self.status == BossStatus::Active
    }

    pub fn defeat_bonus(&self) -> i64 {
        DEFEAT_BONUS_BASE + self.hp_max / DEFEAT_BONUS_HP_DIVISOR
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Name and HP formula of the boss generated for a rank tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BossProfile {
    pub rank: Rank,
    pub name: &'static str,
    pub base_hp: i64,
    pub hp_per_level: i64,
}

impl BossProfile {
    pub fn hp_for_level(&self, level: i64) -> i64 {
        self.base_hp + level.max(1) * self.hp_per_level
    }
}

/// Boss tier for a hero of `rank`.
pub fn boss_profile_for(rank: Rank) -> BossProfile {
    let (name, base_hp, hp_per_level) = match rank {
        Rank::S => ("Deadline Architect", 12_000, 150),
        Rank::A => ("Production Lord", 8_000, 120),
        Rank::B => ("Toxic Reviewer", 5_000, 90),
        Rank::C => ("Context Devourer", 3_500, 70),
        Rank::D => ("Critical Bug", 2_000, 50),
        Rank::E => ("Regression Slime", 1_200, 40),
    };
    BossProfile {
        rank,
        name,
        base_hp,
        hp_per_level,
    }
}

// ---------------------------------------------------------------------------
// Attack outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub boss: BossRun,
    /// Damage dealt by this call.
    pub damage: i64,
    pub events_used: usize,
    /// Damage ever dealt to this boss, this call included.
    pub total_damage: i64,
    /// Whether this call defeated the boss.
    pub defeated: bool,
    pub bonus_xp: i64,
}
