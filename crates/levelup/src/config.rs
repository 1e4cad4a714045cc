//! Runtime configuration.
//!
//! Values come from the environment with defaults, following the
//! home-directory convention:
//!
//! ```text
//! ~/.levelup/            (LEVELUP_HOME)
//! ├── levelup.db         SQLite database
//! └── action.key         hex secret for assistant action tokens
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::activity::focus::FocusRules;
use crate::error::{ProgressError, Result};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:1.5b";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_ACTION_TOKEN_TTL_SECS: u64 = 300;

const DB_FILE: &str = "levelup.db";
const ACTION_KEY_FILE: &str = "action.key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub provider_timeout_secs: u64,
    /// How long a proposed assistant action stays confirmable.
    pub action_token_ttl_secs: u64,
    pub focus: FocusRules,
    #[serde(skip)]
    action_secret_hex: Option<String>,
}

impl Config {
    /// Defaults rooted at `data_dir`, ignoring the environment.
    pub fn for_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            action_token_ttl_secs: DEFAULT_ACTION_TOKEN_TTL_SECS,
            focus: FocusRules::default(),
            action_secret_hex: None,
        }
    }

    /// Resolve configuration from `LEVELUP_HOME`, `LEVELUP_SECRET`,
    /// `OLLAMA_BASE_URL` and `OLLAMA_MODEL`.
    pub fn from_env() -> Result<Self> {
        let data_dir = match std::env::var("LEVELUP_HOME") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var("HOME").map_err(|_| {
                    ProgressError::invalid("LEVELUP_HOME", "neither LEVELUP_HOME nor HOME is set")
                })?;
                PathBuf::from(home).join(".levelup")
            }
        };

        let mut config = Self::for_dir(data_dir);
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            if !url.trim().is_empty() {
                config.ollama_base_url = url;
            }
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            if !model.trim().is_empty() {
                config.ollama_model = model;
            }
        }
        if let Ok(secret) = std::env::var("LEVELUP_SECRET") {
            if !secret.trim().is_empty() {
                config.action_secret_hex = Some(secret.trim().to_string());
            }
        }
        Ok(config)
    }

    /// Use a fixed hex secret instead of the key file.
    pub fn with_action_secret(mut self, secret_hex: impl Into<String>) -> Self {
        self.action_secret_hex = Some(secret_hex.into());
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn action_key_path(&self) -> PathBuf {
        self.data_dir.join(ACTION_KEY_FILE)
    }

    /// Secret bytes used to derive the action-token signing key.
    ///
    /// Order: explicit secret, then `action.key`; if neither exists a random
    /// 32-byte key is generated and written to `action.key`.
    pub fn action_secret(&self) -> Result<Zeroizing<Vec<u8>>> {
        if let Some(ref secret) = self.action_secret_hex {
            return decode_secret(secret, "LEVELUP_SECRET");
        }
        load_or_create_key(&self.action_key_path())
    }
}

fn decode_secret(hex_str: &str, field: &str) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| ProgressError::invalid(field, format!("secret must be hex: {e}")))?;
    if bytes.len() < 16 {
        return Err(ProgressError::invalid(
            field,
            "secret must be at least 16 bytes",
        ));
    }
    Ok(Zeroizing::new(bytes))
}

fn load_or_create_key(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        let contents = Zeroizing::new(std::fs::read_to_string(path)?);
        return decode_secret(&contents, "action.key");
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let key: [u8; 32] = rand::random();
    let encoded = Zeroizing::new(hex::encode(key));
    std::fs::write(path, encoded.as_bytes())?;
    log::info!("generated action signing key at {}", path.display());
    Ok(Zeroizing::new(key.to_vec()))
}
