//! XP ledger: the append-only source of truth for all progression.
//!
//! Every XP change enters through [`award`]. Events carrying a
//! `(source_type, source_id)` key are credited at most once per user; the
//! uniqueness is enforced by a partial unique index, so a duplicate
//! submission observably does nothing.

pub mod award;
pub mod event;
pub mod query;

pub use award::{award, Award, MAX_AWARD_AMOUNT};
pub use event::{EventId, XpEvent, XpKind};
pub use query::{events_since, get_event, list_events, sum_kind_between, total_xp};
