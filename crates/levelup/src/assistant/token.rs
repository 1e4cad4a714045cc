//! Signed action tokens.
//!
//! A proposal is never executed when the model suggests it. It is handed to
//! the user as a token `payload.issued_at.signature`:
//!
//! - `payload`: URL-safe base64 of `{"user": .., "action": {name, args}}`
//! - `issued_at`: Unix seconds
//! - `signature`: Ed25519 over `payload.issued_at`, URL-safe base64
//!
//! Verification checks the signature before the age, so a tampered token is
//! always reported as invalid even when it is also stale.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::derivation::ACTION_CONTEXT;
use crate::crypto::ActionKey;
use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::time::MICROS_PER_SECOND;

use super::action::ActionProposal;

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    user: i64,
    action: ActionProposal,
}

/// Signs and verifies action tokens with a key derived from the configured
/// secret.
#[derive(Debug)]
pub struct ActionSigner {
    key: ActionKey,
    ttl_secs: u64,
}

impl ActionSigner {
    pub fn from_secret(secret: &[u8], ttl_secs: u64) -> Result<Self> {
        Ok(Self {
            key: ActionKey::derive(secret, ACTION_CONTEXT)?,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a token for `proposal`, bound to `user`.
    pub fn sign(&self, user: UserId, proposal: &ActionProposal, now: u64) -> Result<String> {
        let payload = serde_json::to_vec(&TokenPayload {
            user: user.0,
            action: proposal.clone(),
        })?;
        let signed = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            now / MICROS_PER_SECOND
        );
        let signature = self.key.sign_b64(signed.as_bytes());
        Ok(format!("{signed}.{signature}"))
    }

    /// Check a token and return the proposal it carries.
    ///
    /// Fails with `SignatureInvalid` for anything malformed, tampered, or
    /// issued to another user, and with `SignatureExpired` once it is older
    /// than the TTL.
    pub fn verify(&self, user: UserId, token: &str, now: u64) -> Result<ActionProposal> {
        let mut parts = token.trim().split('.');
        let (Some(payload_b64), Some(issued_at), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ProgressError::SignatureInvalid);
        };

        let signed_len = payload_b64.len() + 1 + issued_at.len();
        let signed = &token.trim()[..signed_len];
        self.key
            .verify_b64(signed.as_bytes(), signature)
            .inspect_err(|_| log::warn!("rejected action token with a bad signature"))?;

        let issued_at: u64 = issued_at
            .parse()
            .map_err(|_| ProgressError::SignatureInvalid)?;
        let age = (now / MICROS_PER_SECOND).saturating_sub(issued_at);
        if age > self.ttl_secs {
            log::warn!("rejected action token issued {age}s ago");
            return Err(ProgressError::SignatureExpired);
        }

        let payload: TokenPayload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(ProgressError::SignatureInvalid)?;
        if payload.user != user.0 {
            log::warn!("rejected action token issued to another user");
            return Err(ProgressError::SignatureInvalid);
        }
        Ok(payload.action)
    }
}
