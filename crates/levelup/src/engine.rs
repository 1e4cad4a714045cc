//! `Engine`: the public entry point bundling storage, clock and config.
//!
//! Every per-user operation takes the user explicitly, runs in one write
//! transaction, and ensures the user's stats row exists before doing
//! anything else.

use std::sync::Arc;

use rusqlite::Connection;

use crate::activity::{
    focus, learning, skills, tasks, workouts, FocusKind, FocusSession, LearningLog, NewLearningLog,
    NewProject, NewSkill, NewSkillNode, NewTask, NewWorkout, Project, Skill, SkillId, SkillNode,
    SkillProgress, SkillTrack, SkillUpdate, Task, TaskId, TaskStatus, Workout,
};
use crate::analytics::{self, AnalyticsSummary, Dashboard};
use crate::assistant::{
    chat, profile, ActResult, ActionSigner, AssistantProfile, ChatReply, CompletionProvider,
    HistoryEntry, ProfileUpdate,
};
use crate::config::Config;
use crate::error::Result;
use crate::identity::{self, User, UserId};
use crate::ledger::{self, Award, XpEvent};
use crate::progression::{self, AchievementCounts, DevScoreBreakdown, StatAllocation, UserStats};
use crate::raid::{self, AttackOutcome, BossRun};
use crate::storage::Store;
use crate::time::{Clock, SystemClock};

pub struct Engine {
    store: Store,
    clock: Arc<dyn Clock>,
    config: Config,
    signer: ActionSigner,
}

impl Engine {
    /// Open the database under `config.data_dir` with the system clock.
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::open(&config.db_path())?;
        Self::with_parts(store, Arc::new(SystemClock), config)
    }

    /// Assemble an engine from explicit parts (tests, replays).
    pub fn with_parts(store: Store, clock: Arc<dyn Clock>, config: Config) -> Result<Self> {
        let secret = config.action_secret()?;
        let signer = ActionSigner::from_secret(&secret, config.action_token_ttl_secs)?;
        Ok(Self {
            store,
            clock,
            config,
            signer,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.clock.now_micros()
    }

    fn for_user<T>(&self, user: UserId, f: impl FnOnce(&Connection, u64) -> Result<T>) -> Result<T> {
        let now = self.now();
        self.store.write(|conn| {
            progression::ensure_stats(conn, user, now)?;
            f(conn, now)
        })
    }

    // -- Accounts -----------------------------------------------------------

    pub fn create_user(&self, username: &str) -> Result<User> {
        let now = self.now();
        self.store.write(|conn| {
            let user = identity::create_user(conn, username, now)?;
            progression::ensure_stats(conn, user.id, now)?;
            Ok(user)
        })
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.store.read(|conn| identity::find_user(conn, username))
    }

    pub fn get_or_create_user(&self, username: &str) -> Result<User> {
        let now = self.now();
        self.store.write(|conn| {
            let user = identity::get_or_create_user(conn, username, now)?;
            progression::ensure_stats(conn, user.id, now)?;
            Ok(user)
        })
    }

    // -- Progression --------------------------------------------------------

    pub fn stats(&self, user: UserId) -> Result<UserStats> {
        self.for_user(user, |conn, now| progression::ensure_stats(conn, user, now))
    }

    pub fn allocate_stat_points(&self, user: UserId, delta: &StatAllocation) -> Result<UserStats> {
        self.for_user(user, |conn, now| {
            progression::allocate_stat_points(conn, user, delta, now)
        })
    }

    pub fn recalculate_dev_score(&self, user: UserId) -> Result<DevScoreBreakdown> {
        self.for_user(user, |conn, now| progression::recalculate_dev_score(conn, user, now))
    }

    pub fn achievement_counts(&self, user: UserId) -> Result<AchievementCounts> {
        self.for_user(user, |conn, _| progression::achievement_counts(conn, user))
    }

    // -- Ledger -------------------------------------------------------------

    /// Credit an externally sourced award (commits, PRs, imports).
    pub fn award(&self, award: Award) -> Result<(Option<XpEvent>, UserStats)> {
        let now = self.now();
        self.store.write(|conn| award.apply(conn, now))
    }

    pub fn list_events(&self, user: UserId, limit: usize) -> Result<Vec<XpEvent>> {
        self.for_user(user, |conn, _| ledger::list_events(conn, user, limit))
    }

    // -- Producers ----------------------------------------------------------

    pub fn log_workout(&self, user: UserId, input: &NewWorkout) -> Result<Workout> {
        self.for_user(user, |conn, now| workouts::create_workout(conn, user, input, now))
    }

    pub fn log_learning(&self, user: UserId, input: &NewLearningLog) -> Result<LearningLog> {
        self.for_user(user, |conn, now| learning::create_learning_log(conn, user, input, now))
    }

    pub fn create_project(&self, user: UserId, input: &NewProject) -> Result<Project> {
        self.for_user(user, |conn, now| tasks::create_project(conn, user, input, now))
    }

    pub fn list_projects(&self, user: UserId) -> Result<Vec<Project>> {
        self.for_user(user, |conn, _| tasks::list_projects(conn, user))
    }

    pub fn create_task(&self, user: UserId, input: &NewTask) -> Result<Task> {
        self.for_user(user, |conn, now| tasks::create_task(conn, user, input, now))
    }

    pub fn list_tasks(&self, user: UserId) -> Result<Vec<Task>> {
        self.for_user(user, |conn, _| tasks::list_tasks(conn, user))
    }

    pub fn set_task_status(&self, user: UserId, task: TaskId, status: TaskStatus) -> Result<Task> {
        self.for_user(user, |conn, now| tasks::set_task_status(conn, user, task, status, now))
    }

    pub fn complete_task(&self, user: UserId, task: TaskId) -> Result<Task> {
        self.for_user(user, |conn, now| tasks::complete_task(conn, user, task, now))
    }

    // -- Skill tree ---------------------------------------------------------

    pub fn create_track(&self, code: &str, title: &str, order: i64) -> Result<SkillTrack> {
        let now = self.now();
        self.store
            .write(|conn| skills::create_track(conn, code, title, order, now))
    }

    pub fn create_node(&self, input: &NewSkillNode) -> Result<SkillNode> {
        self.store.write(|conn| skills::create_node(conn, input))
    }

    /// Every track with its nodes, in display order.
    pub fn skill_tree(&self) -> Result<Vec<(SkillTrack, Vec<SkillNode>)>> {
        self.store.read(|conn| {
            skills::list_tracks(conn)?
                .into_iter()
                .map(|track| {
                    let nodes = skills::list_nodes(conn, track.id)?;
                    Ok((track, nodes))
                })
                .collect()
        })
    }

    pub fn create_skill(&self, user: UserId, input: &NewSkill) -> Result<Skill> {
        self.for_user(user, |conn, now| skills::create_skill(conn, user, input, now))
    }

    pub fn update_skill(
        &self,
        user: UserId,
        skill: SkillId,
        update: &SkillUpdate,
    ) -> Result<SkillProgress> {
        self.for_user(user, |conn, now| skills::update_skill(conn, user, skill, update, now))
    }

    pub fn list_skills(&self, user: UserId) -> Result<Vec<Skill>> {
        self.for_user(user, |conn, _| skills::list_skills(conn, user))
    }

    // -- Focus --------------------------------------------------------------

    pub fn start_focus(
        &self,
        user: UserId,
        kind: FocusKind,
        note: &str,
        skill_node_id: Option<i64>,
    ) -> Result<(FocusSession, bool)> {
        self.for_user(user, |conn, now| {
            focus::start_session(conn, user, kind, note, skill_node_id, now)
        })
    }

    pub fn stop_focus(
        &self,
        user: UserId,
        source_url: &str,
    ) -> Result<(Option<FocusSession>, i64)> {
        let rules = self.config.focus;
        self.for_user(user, |conn, now| {
            focus::stop_session(conn, user, &rules, source_url, now)
        })
    }

    pub fn cancel_focus(&self, user: UserId) -> Result<Option<FocusSession>> {
        self.for_user(user, |conn, now| focus::cancel_session(conn, user, now))
    }

    pub fn active_focus(&self, user: UserId) -> Result<Option<FocusSession>> {
        self.for_user(user, |conn, _| focus::active_session(conn, user))
    }

    // -- Boss raid ----------------------------------------------------------

    pub fn boss(&self, user: UserId) -> Result<BossRun> {
        self.for_user(user, |conn, now| raid::ensure_active_boss(conn, user, now))
    }

    pub fn attack_boss(&self, user: UserId, max_events: Option<usize>) -> Result<AttackOutcome> {
        self.for_user(user, |conn, now| raid::attack(conn, user, max_events, now))
    }

    pub fn next_boss(&self, user: UserId) -> Result<BossRun> {
        self.for_user(user, |conn, now| raid::start_next_boss(conn, user, now))
    }

    pub fn boss_history(&self, user: UserId, limit: usize) -> Result<Vec<BossRun>> {
        self.for_user(user, |conn, _| raid::boss_history(conn, user, limit))
    }

    // -- Read models --------------------------------------------------------

    pub fn analytics(&self, user: UserId) -> Result<AnalyticsSummary> {
        self.for_user(user, |conn, now| analytics::analytics_summary(conn, user, now))
    }

    pub fn dashboard(&self, user: UserId) -> Result<Dashboard> {
        self.for_user(user, |conn, now| analytics::dashboard(conn, user, now))
    }

    // -- Assistant ----------------------------------------------------------

    pub fn assistant_profile(&self, user: UserId) -> Result<AssistantProfile> {
        self.for_user(user, |conn, now| profile::get_profile(conn, user, now))
    }

    pub fn update_assistant_profile(
        &self,
        user: UserId,
        update: &ProfileUpdate,
    ) -> Result<AssistantProfile> {
        self.for_user(user, |conn, now| profile::update_profile(conn, user, update, now))
    }

    /// Ask the assistant. Proposes at most one action; executes nothing.
    pub fn chat(
        &self,
        user: UserId,
        provider: &dyn CompletionProvider,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<ChatReply> {
        self.stats(user)?;
        let now = self.now();
        chat::chat(&self.store, &self.signer, provider, user, message, history, now)
    }

    /// Execute the action carried by a confirmed token.
    pub fn act(&self, user: UserId, token: &str) -> Result<ActResult> {
        let now = self.now();
        self.stats(user)?;
        chat::act(&self.store, &self.signer, &self.config.focus, user, token, now)
    }
}
