//! The Ed25519 key behind assistant action tokens.
//!
//! Signatures are detached and travel as the last token segment, so they
//! are encoded as URL-safe base64 without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{ProgressError, Result};

use super::derivation;

/// Signing key derived from the configured secret. `SigningKey` wipes its
/// bytes on drop.
pub struct ActionKey {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl ActionKey {
    /// Derive the key for `context` from `secret`.
    pub fn derive(secret: &[u8], context: &str) -> Result<Self> {
        let signing = derivation::derive_signing_key(secret, context)?;
        let verifying = signing.verifying_key();
        Ok(Self { signing, verifying })
    }

    /// Hex of the public half, safe to log.
    pub fn public_hex(&self) -> String {
        hex::encode(self.verifying.to_bytes())
    }

    pub fn sign_b64(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing.sign(message);
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    }

    /// Check a base64 signature. Undecodable input counts as a bad
    /// signature, never as a separate error.
    pub fn verify_b64(&self, message: &[u8], signature_b64: &str) -> Result<()> {
        let bytes: [u8; 64] = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .ok()
            .and_then(|raw| raw.try_into().ok())
            .ok_or(ProgressError::SignatureInvalid)?;
        self.verifying
            .verify(message, &Signature::from_bytes(&bytes))
            .map_err(|_| ProgressError::SignatureInvalid)
    }
}

impl std::fmt::Debug for ActionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionKey")
            .field("public", &self.public_hex())
            .finish_non_exhaustive()
    }
}
