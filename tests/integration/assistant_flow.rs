//! Integration test: assistant proposes, user confirms, engine executes.
//!
//! Uses a scripted completion provider so no model backend is needed.

use std::sync::{Arc, Mutex};

use levelup::activity::{NewProject, NewTask, TaskKind, TaskStatus};
use levelup::assistant::{ChatMessage, ChatRole, CompletionProvider, HistoryEntry, ProfileUpdate};
use levelup::{Config, Engine, ManualClock, ProgressError, Result, Store};

const SECRET: &str = "ffeeddccbbaa99887766554433221100ffeeddccbbaa99887766554433221100";
const T0: u64 = 1_760_000_000_000_000;

/// Replies with a fixed text and records what it was asked.
struct ScriptedProvider {
    reply: String,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> Vec<ChatMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted"
    }

    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

struct FailingProvider;

impl CompletionProvider for FailingProvider {
    fn model(&self) -> &str {
        "offline"
    }

    fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(ProgressError::Provider("connection refused".into()))
    }
}

fn engine() -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let config = Config::for_dir(std::env::temp_dir()).with_action_secret(SECRET);
    let engine = Engine::with_parts(Store::open_in_memory().unwrap(), clock.clone(), config)
        .expect("engine should open");
    (engine, clock)
}

#[test]
fn chat_proposes_and_act_executes_focus_cycle() {
    let (engine, clock) = engine();
    let user = engine.create_user("pilot").unwrap().id;

    let start = ScriptedProvider::new(
        "Let's get going.\n```action\n{\"name\": \"focus_start\", \"args\": {\"kind\": \"reading\", \"note\": \"docs\"}}\n```",
    );
    let reply = engine.chat(user, &start, "start a reading session", &[]).unwrap();
    assert_eq!(reply.reply, "Let's get going.");
    assert_eq!(reply.model, "scripted");
    let proposal = reply.proposed_action.expect("action should be proposed");
    assert_eq!(proposal.name, "focus_start");
    let token = reply.action_token.expect("token should be issued");

    // Proposing executes nothing.
    assert!(engine.active_focus(user).unwrap().is_none());

    let outcome = engine.act(user, &token).unwrap();
    assert_eq!(outcome.action.name, "focus_start");
    assert_eq!(outcome.result["kind"], "reading");
    assert_eq!(outcome.result["created"], true);
    assert!(engine.active_focus(user).unwrap().is_some());

    clock.advance_minutes(25);
    let stop = ScriptedProvider::new("Nice work.\n```ACTION\n{\"name\": \"focus_stop\"}\n```");
    let reply = engine.chat(user, &stop, "done", &[]).unwrap();
    let token = reply.action_token.unwrap();
    let outcome = engine.act(user, &token).unwrap();
    assert_eq!(outcome.result["xp_awarded"], 50);
    assert_eq!(engine.stats(user).unwrap().xp, 50);

    // A replayed stop finds no session.
    assert!(matches!(
        engine.act(user, &token),
        Err(ProgressError::NotFound(_))
    ));
}

#[test]
fn act_completes_task_through_token() {
    let (engine, _) = engine();
    let user = engine.create_user("closer").unwrap().id;
    let project = engine
        .create_project(
            user,
            &NewProject {
                name: "Infra".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let task = engine
        .create_task(
            user,
            &NewTask {
                project_id: project.id,
                title: "Rotate certs".into(),
                kind: TaskKind::Main,
                difficulty: 2,
                deadline: None,
                notes: String::new(),
            },
        )
        .unwrap();

    let provider = ScriptedProvider::new(format!(
        "Marking it done.\n```action\n{{\"name\": \"task_complete\", \"args\": {{\"task_id\": {}}}}}\n```",
        task.id
    ));
    let reply = engine.chat(user, &provider, "I finished the certs", &[]).unwrap();
    let outcome = engine.act(user, &reply.action_token.unwrap()).unwrap();
    assert_eq!(outcome.result["status"], "done");
    assert_eq!(outcome.result["xp_reward"], 100);

    let tasks = engine.list_tasks(user).unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Done);
    assert_eq!(engine.stats(user).unwrap().xp, 100);
}

#[test]
fn tokens_expire_and_are_bound_to_user() {
    let (engine, clock) = engine();
    let alice = engine.create_user("alice").unwrap().id;
    let bob = engine.create_user("bob").unwrap().id;

    let provider = ScriptedProvider::new("```action\n{\"name\": \"hero_stats\"}\n```");
    let token = engine
        .chat(alice, &provider, "how am I doing?", &[])
        .unwrap()
        .action_token
        .unwrap();

    assert!(matches!(
        engine.act(bob, &token),
        Err(ProgressError::SignatureInvalid)
    ));

    let mut tampered = token.clone();
    tampered.insert(0, 'x');
    assert!(matches!(
        engine.act(alice, &tampered),
        Err(ProgressError::SignatureInvalid)
    ));

    clock.advance_secs(301);
    assert!(matches!(
        engine.act(alice, &token),
        Err(ProgressError::SignatureExpired)
    ));
    assert!(matches!(
        engine.act(alice, "  "),
        Err(ProgressError::Validation { .. })
    ));
}

#[test]
fn unusable_proposals_are_dropped() {
    let (engine, _) = engine();
    let user = engine.create_user("skeptic").unwrap().id;

    for raw in [
        "```action\n{\"name\": \"delete_everything\"}\n```",
        "```action\n{\"name\": \"boss_attack\", \"args\": {\"power\": 9000}}\n```",
        "```action\n{not json}\n```",
    ] {
        let provider = ScriptedProvider::new(format!("Sure.\n{raw}"));
        let reply = engine.chat(user, &provider, "do it", &[]).unwrap();
        assert!(reply.proposed_action.is_none(), "proposal from {raw:?}");
        assert!(reply.action_token.is_none());
    }
}

#[test]
fn prompt_carries_profile_and_sanitized_history() {
    let (engine, _) = engine();
    let user = engine.create_user("mentee").unwrap().id;
    engine
        .update_assistant_profile(
            user,
            &ProfileUpdate {
                preferred_name: Some("Mika".into()),
                assistant_persona: Some("You are a terse drill sergeant.".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let history = vec![
        HistoryEntry {
            role: "user".into(),
            content: "hi".into(),
        },
        HistoryEntry {
            role: "function".into(),
            content: "ignored".into(),
        },
        HistoryEntry {
            role: "assistant".into(),
            content: "hello Mika".into(),
        },
    ];
    let provider = ScriptedProvider::new("Move.");
    let reply = engine.chat(user, &provider, "what next?", &history).unwrap();
    assert!(reply.proposed_action.is_none());

    let prompt = provider.last_prompt();
    assert_eq!(prompt.len(), 4);
    assert_eq!(prompt[0].role, ChatRole::System);
    assert!(prompt[0].content.contains("Mika"));
    assert!(prompt[0].content.contains("drill sergeant"));
    assert_eq!(prompt[3].content, "what next?");

    assert!(matches!(
        engine.chat(user, &provider, "   ", &[]),
        Err(ProgressError::Validation { .. })
    ));
    assert!(matches!(
        engine.chat(user, &FailingProvider, "hello", &[]),
        Err(ProgressError::Provider(_))
    ));
}
