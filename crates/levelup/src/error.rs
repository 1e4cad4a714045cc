//! Error types for LevelUp.
//!
//! All errors are strongly typed and propagated without panicking.
//! A duplicate XP source key is not an error: the ledger returns the
//! prior state instead.

use std::collections::BTreeMap;

use serde::Serialize;

/// Key used for errors that do not belong to a single input field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Progression error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient stat points: requested {requested}, available {available}")]
    InsufficientPoints { requested: i64, available: i64 },

    #[error("Action token expired, request it again")]
    SignatureExpired,

    #[error("Action token signature is invalid")]
    SignatureInvalid,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Completion provider error: {0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProgressError {
    /// Build a field-level validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The input field this error refers to, if any.
    pub fn field(&self) -> &str {
        match self {
            Self::Validation { field, .. } => field.as_str(),
            _ => NON_FIELD_ERRORS,
        }
    }

    /// Message shown to the caller. Validation errors drop the field prefix
    /// because the envelope already keys them by field.
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Convert into the uniform error envelope returned at the boundary.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let mut errors = BTreeMap::new();
        errors.insert(self.field().to_string(), vec![self.message()]);
        ErrorEnvelope {
            success: false,
            data: None,
            errors,
        }
    }
}

impl From<rusqlite::Error> for ProgressError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ProgressError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Uniform failure shape: `{ success: false, data: null, errors: {field: [msg]} }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub errors: BTreeMap<String, Vec<String>>,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ProgressError>;
