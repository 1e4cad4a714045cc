//! Chat and confirmation flow.
//!
//! [`chat`] never changes progression state: it asks the model for a reply
//! and, if the reply proposes a valid action, returns it with a signed
//! token. [`act`] is the only path that executes a proposal, and only for a
//! token that verifies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::FocusRules;
use crate::error::{ProgressError, Result};
use crate::identity::UserId;
use crate::storage::Store;

use super::action::{action_catalog, extract_action, ActionProposal, AssistantAction};
use super::dispatch;
use super::profile::{self, AssistantProfile};
use super::provider::{ChatMessage, ChatRole, CompletionProvider};
use super::token::ActionSigner;

/// Entries of client-supplied history kept, newest last.
pub const HISTORY_LIMIT: usize = 10;
/// Longest message content forwarded to the model, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A history entry as sent by a client; the role is not trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub proposed_action: Option<ActionProposal>,
    pub action_token: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActResult {
    pub result: Value,
    pub action: ActionProposal,
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Keep the last [`HISTORY_LIMIT`] entries that have a known role and
/// non-empty content, each truncated to [`MAX_MESSAGE_CHARS`].
pub fn sanitize_history(history: &[HistoryEntry]) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(HISTORY_LIMIT);
    history[start..]
        .iter()
        .filter_map(|entry| {
            let role = ChatRole::parse(&entry.role)?;
            let content = entry.content.trim();
            if content.is_empty() {
                return None;
            }
            Some(ChatMessage::new(role, truncate_chars(content, MAX_MESSAGE_CHARS)))
        })
        .collect()
}

/// System prompt: action catalog, what the user told us about themselves,
/// then the persona.
pub fn system_prompt(profile: &AssistantProfile) -> String {
    let mut prompt = String::from(
        "You help the user track their progression. You can propose ONE action by \
         ending your reply with a fenced block:\n```action\n{\"name\": \"...\", \"args\": {}}\n```\n\
         The user must confirm before anything happens. Available actions:\n",
    );
    for spec in action_catalog() {
        prompt.push_str(&format!("- {}: {}\n", spec.name, spec.description));
    }

    let memory: Vec<String> = [
        ("Preferred name", &profile.preferred_name),
        ("How to address them", &profile.how_to_address),
        ("About them", &profile.about_me),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .map(|(label, value)| format!("{label}: {}", value.trim()))
    .collect();
    if !memory.is_empty() {
        prompt.push_str("\nWhat you know about the user:\n");
        prompt.push_str(&memory.join("\n"));
        prompt.push('\n');
    }

    prompt.push('\n');
    prompt.push_str(profile.persona());
    prompt
}

/// Full message list sent to the provider.
pub fn build_messages(
    profile: &AssistantProfile,
    history: &[HistoryEntry],
    message: &str,
) -> Result<Vec<ChatMessage>> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ProgressError::invalid("message", "this field may not be blank"));
    }
    let mut messages = vec![ChatMessage::new(ChatRole::System, system_prompt(profile))];
    messages.extend(sanitize_history(history));
    messages.push(ChatMessage::new(
        ChatRole::User,
        truncate_chars(message, MAX_MESSAGE_CHARS),
    ));
    Ok(messages)
}

/// Ask the model and return its reply with a signed proposal, if any.
///
/// The provider call runs outside any database transaction.
pub fn chat(
    store: &Store,
    signer: &ActionSigner,
    provider: &dyn CompletionProvider,
    user: UserId,
    message: &str,
    history: &[HistoryEntry],
    now: u64,
) -> Result<ChatReply> {
    let profile = store.write(|conn| profile::get_profile(conn, user, now))?;
    let messages = build_messages(&profile, history, message)?;

    let raw = provider.complete(&messages).inspect_err(|e| {
        log::warn!("completion provider {} failed: {e}", provider.model());
    })?;
    let (reply, proposal) = extract_action(&raw);

    let proposal = proposal.and_then(|p| match AssistantAction::from_proposal(&p) {
        Ok(action) => Some(action.to_proposal()),
        Err(e) => {
            log::debug!("dropping unusable proposal '{}': {e}", p.name);
            None
        }
    });
    let action_token = proposal
        .as_ref()
        .map(|p| signer.sign(user, p, now))
        .transpose()?;

    Ok(ChatReply {
        reply,
        proposed_action: proposal,
        action_token,
        model: provider.model().to_string(),
    })
}

/// Verify a token and execute the action it carries.
pub fn act(
    store: &Store,
    signer: &ActionSigner,
    rules: &FocusRules,
    user: UserId,
    token: &str,
    now: u64,
) -> Result<ActResult> {
    if token.trim().is_empty() {
        return Err(ProgressError::invalid("token", "this field may not be blank"));
    }
    let proposal = signer.verify(user, token, now)?;
    let action = AssistantAction::from_proposal(&proposal)?;
    let result = store.write(|conn| dispatch::execute(conn, user, &action, rules, now))?;
    Ok(ActResult {
        result,
        action: action.to_proposal(),
    })
}
