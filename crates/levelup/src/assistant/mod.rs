//! Assistant bridge: turns model-proposed `{name, args}` directives into
//! progression operations, but only after the user confirms a signed
//! token.
//!
//! - [`action`]: the closed action set, the catalog, and extraction of the
//!   fenced `action` block from model text.
//! - [`token`]: Ed25519-signed, time-limited action tokens.
//! - [`dispatch`]: executes a validated action.
//! - [`provider`]: the completion backend trait and the Ollama client.
//! - [`profile`]: per-user memory and persona.
//! - [`chat`]: the chat and confirm flow.

pub mod action;
pub mod chat;
pub mod dispatch;
pub mod profile;
pub mod provider;
pub mod token;

pub use action::{action_catalog, extract_action, ActionProposal, ActionSpec, AssistantAction};
pub use chat::{ActResult, ChatReply, HistoryEntry};
pub use profile::{AssistantProfile, ProfileUpdate};
pub use provider::{ChatMessage, ChatRole, CompletionProvider, DisabledProvider};
#[cfg(feature = "ollama")]
pub use provider::OllamaProvider;
pub use token::ActionSigner;
