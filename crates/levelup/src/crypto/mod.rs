//! Cryptography for assistant action tokens: HKDF-SHA256 key derivation
//! from the configured secret, and the Ed25519 [`ActionKey`] that signs
//! and checks token segments.

pub mod action_key;
pub mod derivation;

pub use action_key::ActionKey;
