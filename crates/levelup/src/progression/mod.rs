//! Progression aggregator: level, XP, stat points, dev score and rank
//! derived from the XP ledger.

pub mod level;
pub mod score;
pub mod stats;

pub use level::{
    level_for_xp, rank_for_dev_score, xp_required_to_reach_level, xp_to_next_level, Rank,
};
pub use score::{achievement_counts, recalculate_dev_score, AchievementCounts, DevScoreBreakdown};
pub use stats::{add_xp, allocate_stat_points, ensure_stats, StatAllocation, UserStats};
