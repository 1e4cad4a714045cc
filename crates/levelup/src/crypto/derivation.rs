//! Key derivation using HKDF-SHA256.
//!
//! The configured secret is never used as a key directly: each purpose
//! derives its own 32-byte key under a fixed salt and a context string.

use ed25519_dalek::SigningKey;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{ProgressError, Result};

/// Salt shared by every key derived from the LevelUp secret.
pub const DERIVATION_SALT: &[u8] = b"levelup/v1";

/// Derive a 32-byte key from `secret` for `context`.
pub fn derive_key(secret: &[u8], context: &str) -> Result<Zeroizing<[u8; 32]>> {
    if secret.is_empty() {
        return Err(ProgressError::KeyDerivation("secret is empty".into()));
    }
    let hk = Hkdf::<Sha256>::new(Some(DERIVATION_SALT), secret);
    let mut output = Zeroizing::new([0u8; 32]);
    hk.expand(context.as_bytes(), &mut output[..])
        .map_err(|e| ProgressError::KeyDerivation(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}

/// Derive an Ed25519 signing key from `secret` for `context`.
pub fn derive_signing_key(secret: &[u8], context: &str) -> Result<SigningKey> {
    let derived = derive_key(secret, context)?;
    Ok(SigningKey::from_bytes(&derived))
}

/// Context for the key that signs assistant action proposals.
pub const ACTION_CONTEXT: &str = "levelup/ai-action";
