//! Accounts: the owners every record is scoped to.
//!
//! Authentication lives outside this crate; callers resolve "the current
//! user" and pass the resulting [`UserId`] explicitly to every operation.

pub mod user;

pub use user::{create_user, find_user, get_or_create_user, get_user, User, UserId};
