//! Text-completion backends.

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn parse(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A chat model: given a message list, returns the reply text.
pub trait CompletionProvider: Send + Sync {
    /// Model identifier reported back to the caller.
    fn model(&self) -> &str;

    /// Failures of any kind are reported as [`ProgressError::Provider`].
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Provider that always fails; used when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProvider;

impl CompletionProvider for DisabledProvider {
    fn model(&self) -> &str {
        "disabled"
    }

    fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(ProgressError::Provider("no completion provider configured".into()))
    }
}

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;

#[cfg(feature = "ollama")]
mod ollama {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use super::{ChatMessage, CompletionProvider};
    use crate::config::Config;
    use crate::error::{ProgressError, Result};

    #[derive(Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: &'a [ChatMessage],
        stream: bool,
    }

    #[derive(Deserialize)]
    struct ChatResponse {
        message: ResponseMessage,
    }

    #[derive(Deserialize)]
    struct ResponseMessage {
        #[serde(default)]
        content: String,
    }

    /// Chat over a local Ollama server (`POST {base}/api/chat`).
    #[derive(Debug, Clone)]
    pub struct OllamaProvider {
        client: reqwest::blocking::Client,
        base_url: String,
        model: String,
    }

    impl OllamaProvider {
        pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ProgressError::Provider(format!("failed to build HTTP client: {e}")))?;
            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                model: model.to_string(),
            })
        }

        pub fn from_config(config: &Config) -> Result<Self> {
            Self::new(
                &config.ollama_base_url,
                &config.ollama_model,
                Duration::from_secs(config.provider_timeout_secs),
            )
        }
    }

    impl CompletionProvider for OllamaProvider {
        fn model(&self) -> &str {
            &self.model
        }

        fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            let url = format!("{}/api/chat", self.base_url);
            let request = ChatRequest {
                model: &self.model,
                messages,
                stream: false,
            };

            let resp = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .map_err(|e| {
                    log::warn!("ollama request to {url} failed: {e}");
                    ProgressError::Provider(format!("failed to reach Ollama at {url}: {e}"))
                })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().unwrap_or_default();
                log::warn!("ollama returned {status}");
                return Err(ProgressError::Provider(format!(
                    "Ollama request failed ({status}): {body}"
                )));
            }

            let parsed: ChatResponse = resp
                .json()
                .map_err(|e| ProgressError::Provider(format!("malformed Ollama response: {e}")))?;
            let content = parsed.message.content.trim().to_string();
            if content.is_empty() {
                return Err(ProgressError::Provider("Ollama returned an empty reply".into()));
            }
            Ok(content)
        }
    }
}
