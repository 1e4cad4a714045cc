//! Boss raid: XP events are spent as damage against a per-user boss.
//!
//! Each user fights at most one active boss. [`attack`] consumes ledger
//! events created since the boss appeared; every event can be consumed at
//! most once, by one boss. Bringing a boss to 0 HP defeats it and credits
//! a one-time bonus.

pub mod engine;
pub mod types;

pub use engine::{attack, boss_history, ensure_active_boss, start_next_boss, total_damage};
pub use types::{
    boss_profile_for, AttackOutcome, BossId, BossProfile, BossRun, BossStatus,
    DEFAULT_ATTACK_EVENTS, MAX_ATTACK_EVENTS,
};
