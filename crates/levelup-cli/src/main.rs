//! LevelUp CLI: `lvl` command.
//!
//! Log workouts, tasks and focus sessions, watch the hero level up, fight
//! the current boss with earned XP, and confirm actions proposed by the
//! local assistant.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use levelup::activity::{
    FocusKind, NewLearningLog, NewProject, NewSkill, NewSkillNode, NewTask, NewWorkout, ProjectId,
    SkillId, SkillUpdate, TaskId, TaskKind,
};
use levelup::assistant::{CompletionProvider, DisabledProvider, OllamaProvider, ProfileUpdate};
use levelup::time::{local_date, micros_to_local_display};
use levelup::{Config, Engine, FocusSession, StatAllocation, UserId, UserStats};

// ── Engine helpers ────────────────────────────────────────────────────────────

fn open_engine() -> Result<Engine> {
    let config = Config::from_env().context("failed to resolve configuration")?;
    Engine::open(config).context("failed to open the LevelUp database")
}

fn resolve_user(engine: &Engine, username: &str) -> Result<UserId> {
    let user = engine
        .get_or_create_user(username)
        .with_context(|| format!("failed to load user '{username}'"))?;
    Ok(user.id)
}

fn print_stats(stats: &UserStats) {
    println!("  Level:      {}", stats.level);
    println!("  XP:         {} (next level step {})", stats.xp, stats.xp_to_next_level);
    println!("  Rank:       {} ({})", stats.rank, stats.rank.title());
    println!("  Dev score:  {}", stats.dev_score);
    println!("  Stat points: {}", stats.stat_points);
}

fn print_session(session: &FocusSession) {
    println!("  Session: {}", session.id);
    println!("  Kind:    {}", session.kind);
    println!("  Started: {}", micros_to_local_display(session.started_at));
    if !session.note.is_empty() {
        println!("  Note:    {}", session.note);
    }
    if let Some(node) = session.skill_node_id {
        println!("  Skill node: {node}");
    }
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// LevelUp CLI: turn productive work into XP, levels and boss fights.
#[derive(Parser, Debug)]
#[command(
    name = "lvl",
    about = "LevelUp CLI",
    version,
    long_about = "lvl: LevelUp CLI\n\nLog workouts, tasks, learning and focus sessions, level up your hero,\nraid bosses with the XP you earn, and confirm assistant actions."
)]
struct Cli {
    /// Act as this user (created on first use)
    #[arg(long, global = true, default_value = "default")]
    user: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hero stats and stat-point allocation
    Hero {
        #[command(subcommand)]
        subcommand: HeroCommands,
    },

    /// Log workouts
    Workout {
        #[command(subcommand)]
        subcommand: WorkoutCommands,
    },

    /// Log learning
    Log {
        #[command(subcommand)]
        subcommand: LogCommands,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectCommands,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskCommands,
    },

    /// Manage skills and the skill-tree catalogue
    Skill {
        #[command(subcommand)]
        subcommand: SkillCommands,
    },

    /// Timed focus sessions
    Focus {
        #[command(subcommand)]
        subcommand: FocusCommands,
    },

    /// Boss raid
    Boss {
        #[command(subcommand)]
        subcommand: BossCommands,
    },

    /// Show recent XP events
    Events {
        /// Maximum number of events to display
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// XP by day and kind over the last 30 days, with streaks
    Analytics,

    /// Dashboard summary
    Dashboard,

    /// Local assistant
    Ai {
        #[command(subcommand)]
        subcommand: AiCommands,
    },
}

#[derive(Subcommand, Debug)]
enum HeroCommands {
    /// Show level, XP, rank and attributes
    Show,

    /// Spend unallocated stat points
    Allocate {
        #[arg(long, default_value = "0")]
        strength: i64,
        #[arg(long, default_value = "0")]
        agility: i64,
        #[arg(long, default_value = "0")]
        intelligence: i64,
        #[arg(long, default_value = "0")]
        vitality: i64,
    },
}

#[derive(Subcommand, Debug)]
enum WorkoutCommands {
    /// Log a workout
    Add {
        /// Workout type (e.g. run, gym, yoga)
        #[arg(long)]
        r#type: String,

        /// Duration in minutes
        #[arg(long)]
        minutes: i64,

        /// Intensity from 1 to 10
        #[arg(long)]
        intensity: i64,

        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, default_value = "")]
        comment: String,
    },
}

#[derive(Subcommand, Debug)]
enum LogCommands {
    /// Add a learning log entry
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCommands {
    /// Create a project
    Add {
        #[arg(long)]
        name: String,

        /// Mark as a commercial project (counts toward dev score)
        #[arg(long)]
        commercial: bool,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        stack: String,

        #[arg(long, default_value = "")]
        role: String,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommands {
    /// Create a task in a project
    Add {
        /// Project ID
        #[arg(long)]
        project: i64,

        #[arg(long)]
        title: String,

        /// Task type (daily, main, internship)
        #[arg(long, default_value = "main")]
        r#type: String,

        /// Difficulty from 1 to 5
        #[arg(long, default_value = "1")]
        difficulty: i64,

        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<NaiveDate>,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Mark a task done and collect its XP
    Complete {
        /// Task ID
        task_id: i64,
    },

    /// List tasks
    List,
}

#[derive(Subcommand, Debug)]
enum SkillCommands {
    /// Add a skill, free-form or bound to a skill-tree node
    Add {
        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        category: String,

        #[arg(long, default_value = "0")]
        level: i64,

        /// Skill-tree node ID
        #[arg(long)]
        node: Option<i64>,
    },

    /// Update a skill's level, name or category
    Update {
        /// Skill ID
        skill_id: i64,

        #[arg(long)]
        level: Option<i64>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Create a skill-tree track
    Track {
        #[arg(long)]
        code: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "0")]
        order: i64,
    },

    /// Create a skill-tree node in a track
    Node {
        /// Track ID
        #[arg(long)]
        track: i64,

        #[arg(long)]
        code: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "100")]
        max_level: i64,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List your skills and the skill tree
    List,
}

#[derive(Subcommand, Debug)]
enum FocusCommands {
    /// Start a focus session (returns the running one if any)
    Start {
        /// Kind (coding, learning, debugging, reading, review, interview)
        #[arg(long, default_value = "coding")]
        kind: String,

        #[arg(long, default_value = "")]
        note: String,

        /// Skill-tree node ID this session trains
        #[arg(long)]
        node: Option<i64>,
    },

    /// Stop the running session and collect XP
    Stop {
        /// Link to the work done (commit, PR, doc)
        #[arg(long, default_value = "")]
        url: String,
    },

    /// Cancel the running session without XP
    Cancel,

    /// Show the running session
    Status,
}

#[derive(Subcommand, Debug)]
enum BossCommands {
    /// Show the current boss
    Status,

    /// Attack the current boss with XP earned since it appeared
    Attack {
        /// Maximum number of XP events to spend (1-500)
        #[arg(long)]
        max_events: Option<usize>,
    },

    /// Skip to a new boss matching your rank
    Next,

    /// Show recent bosses
    History {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum AiCommands {
    /// Send a message to the assistant
    Chat {
        /// Message text
        message: String,
    },

    /// Confirm and execute a proposed action
    Act {
        /// Action token printed by `lvl ai chat`
        token: String,
    },

    /// Show or update what the assistant remembers about you
    Profile {
        #[arg(long)]
        preferred_name: Option<String>,

        #[arg(long)]
        how_to_address: Option<String>,

        #[arg(long)]
        about_me: Option<String>,

        #[arg(long)]
        persona: Option<String>,
    },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = open_engine().and_then(|engine| {
        let user = resolve_user(&engine, &cli.user)?;
        run(&engine, user, cli.command, verbose)
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(engine: &Engine, user: UserId, command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Hero { subcommand } => match subcommand {
            HeroCommands::Show => cmd_hero_show(engine, user, verbose),
            HeroCommands::Allocate {
                strength,
                agility,
                intelligence,
                vitality,
            } => cmd_hero_allocate(
                engine,
                user,
                StatAllocation {
                    strength,
                    agility,
                    intelligence,
                    vitality,
                },
            ),
        },
        Commands::Workout { subcommand } => match subcommand {
            WorkoutCommands::Add {
                r#type,
                minutes,
                intensity,
                date,
                comment,
            } => cmd_workout_add(
                engine,
                user,
                NewWorkout {
                    kind: r#type,
                    duration_minutes: minutes,
                    intensity,
                    date,
                    comment,
                },
            ),
        },
        Commands::Log { subcommand } => match subcommand {
            LogCommands::Add {
                title,
                description,
                date,
            } => cmd_log_add(
                engine,
                user,
                NewLearningLog {
                    title,
                    description,
                    date,
                },
            ),
        },
        Commands::Project { subcommand } => match subcommand {
            ProjectCommands::Add {
                name,
                commercial,
                description,
                stack,
                role,
            } => cmd_project_add(
                engine,
                user,
                NewProject {
                    name,
                    is_commercial: commercial,
                    description,
                    stack,
                    role,
                },
            ),
        },
        Commands::Task { subcommand } => match subcommand {
            TaskCommands::Add {
                project,
                title,
                r#type,
                difficulty,
                deadline,
                notes,
            } => {
                let kind = TaskKind::parse(&r#type)?;
                cmd_task_add(
                    engine,
                    user,
                    NewTask {
                        project_id: ProjectId(project),
                        title,
                        kind,
                        difficulty,
                        deadline,
                        notes,
                    },
                )
            }
            TaskCommands::Complete { task_id } => cmd_task_complete(engine, user, task_id, verbose),
            TaskCommands::List => cmd_task_list(engine, user),
        },
        Commands::Skill { subcommand } => match subcommand {
            SkillCommands::Add {
                name,
                category,
                level,
                node,
            } => cmd_skill_add(
                engine,
                user,
                NewSkill {
                    name,
                    category,
                    level,
                    node_id: node,
                },
            ),
            SkillCommands::Update {
                skill_id,
                level,
                name,
                category,
            } => cmd_skill_update(
                engine,
                user,
                skill_id,
                SkillUpdate {
                    name,
                    category,
                    level,
                },
            ),
            SkillCommands::Track { code, title, order } => {
                cmd_skill_track(engine, &code, &title, order)
            }
            SkillCommands::Node {
                track,
                code,
                title,
                max_level,
                description,
            } => cmd_skill_node(
                engine,
                NewSkillNode {
                    track_id: track,
                    code,
                    title,
                    description,
                    max_level,
                    order: 0,
                },
            ),
            SkillCommands::List => cmd_skill_list(engine, user),
        },
        Commands::Focus { subcommand } => match subcommand {
            FocusCommands::Start { kind, note, node } => {
                cmd_focus_start(engine, user, &kind, &note, node)
            }
            FocusCommands::Stop { url } => cmd_focus_stop(engine, user, &url, verbose),
            FocusCommands::Cancel => cmd_focus_cancel(engine, user),
            FocusCommands::Status => cmd_focus_status(engine, user),
        },
        Commands::Boss { subcommand } => match subcommand {
            BossCommands::Status => cmd_boss_status(engine, user),
            BossCommands::Attack { max_events } => cmd_boss_attack(engine, user, max_events),
            BossCommands::Next => cmd_boss_next(engine, user),
            BossCommands::History { limit } => cmd_boss_history(engine, user, limit),
        },
        Commands::Events { limit } => cmd_events(engine, user, limit, verbose),
        Commands::Analytics => cmd_analytics(engine, user),
        Commands::Dashboard => cmd_dashboard(engine, user),
        Commands::Ai { subcommand } => match subcommand {
            AiCommands::Chat { message } => cmd_ai_chat(engine, user, &message, verbose),
            AiCommands::Act { token } => cmd_ai_act(engine, user, &token),
            AiCommands::Profile {
                preferred_name,
                how_to_address,
                about_me,
                persona,
            } => cmd_ai_profile(
                engine,
                user,
                ProfileUpdate {
                    preferred_name,
                    how_to_address,
                    about_me,
                    assistant_persona: persona,
                },
            ),
        },
    }
}

// ── Hero ──────────────────────────────────────────────────────────────────────

/// `lvl hero show`
fn cmd_hero_show(engine: &Engine, user: UserId, verbose: bool) -> Result<()> {
    let stats = engine.stats(user)?;
    println!("Hero");
    print_stats(&stats);
    println!("  Strength:     {}", stats.strength);
    println!("  Agility:      {}", stats.agility);
    println!("  Intelligence: {}", stats.intelligence);
    println!("  Vitality:     {}", stats.vitality);

    if verbose {
        let counts = engine.achievement_counts(user)?;
        println!("  Avg skill level:     {}", counts.avg_skill_level);
        println!("  Completed tasks:     {}", counts.completed_tasks);
        println!("  Mastered skills:     {}", counts.mastered_skills);
        println!("  Commercial projects: {}", counts.commercial_projects);
    }
    Ok(())
}

/// `lvl hero allocate --strength N ...`
fn cmd_hero_allocate(engine: &Engine, user: UserId, delta: StatAllocation) -> Result<()> {
    if delta.total() == 0 {
        return Err(anyhow!("nothing to allocate: pass at least one of --strength, --agility, --intelligence, --vitality"));
    }
    let stats = engine
        .allocate_stat_points(user, &delta)
        .context("failed to allocate stat points")?;
    println!("Allocated {} stat point(s)", delta.total());
    println!("  Strength:     {}", stats.strength);
    println!("  Agility:      {}", stats.agility);
    println!("  Intelligence: {}", stats.intelligence);
    println!("  Vitality:     {}", stats.vitality);
    println!("  Remaining:    {}", stats.stat_points);
    Ok(())
}

// ── Producers ─────────────────────────────────────────────────────────────────

/// `lvl workout add --type T --minutes M --intensity I`
fn cmd_workout_add(engine: &Engine, user: UserId, input: NewWorkout) -> Result<()> {
    let workout = engine.log_workout(user, &input)?;
    println!("Logged workout {}", workout.id);
    println!("  Type:      {}", workout.kind);
    println!("  Duration:  {} min", workout.duration_minutes);
    println!("  Intensity: {}", workout.intensity);
    println!("  Date:      {}", workout.date);
    println!("  XP:        +{}", workout.xp());
    Ok(())
}

/// `lvl log add --title T`
fn cmd_log_add(engine: &Engine, user: UserId, input: NewLearningLog) -> Result<()> {
    let entry = engine.log_learning(user, &input)?;
    println!("Logged learning {}", entry.id);
    println!("  Title: {}", entry.title);
    println!("  Date:  {}", entry.date);
    println!("  XP:    +{}", levelup::activity::LEARNING_LOG_XP);
    Ok(())
}

/// `lvl project add --name N [--commercial]`
fn cmd_project_add(engine: &Engine, user: UserId, input: NewProject) -> Result<()> {
    let project = engine.create_project(user, &input)?;
    println!("Created project '{}'", project.name);
    println!("  ID:         {}", project.id);
    println!("  Commercial: {}", if project.is_commercial { "yes" } else { "no" });
    if !project.stack.is_empty() {
        println!("  Stack:      {}", project.stack);
    }
    Ok(())
}

/// `lvl task add --project P --title T`
fn cmd_task_add(engine: &Engine, user: UserId, input: NewTask) -> Result<()> {
    let task = engine.create_task(user, &input)?;
    println!("Created task {}", task.id);
    println!("  Title:      {}", task.title);
    println!("  Type:       {}", task.kind);
    println!("  Difficulty: {} ({} XP on completion)", task.difficulty, task.xp_reward());
    if let Some(deadline) = task.deadline {
        println!("  Deadline:   {deadline}");
    }
    Ok(())
}

/// `lvl task complete ID`
fn cmd_task_complete(engine: &Engine, user: UserId, task_id: i64, verbose: bool) -> Result<()> {
    let before = engine.stats(user)?;
    let task = engine
        .complete_task(user, TaskId(task_id))
        .with_context(|| format!("failed to complete task {task_id}"))?;
    let after = engine.stats(user)?;

    println!("Task {} done: {}", task.id, task.title);
    let gained = after.xp - before.xp;
    if gained > 0 {
        println!("  XP:    +{gained}");
    } else {
        println!("  XP:    already collected");
    }
    if after.level > before.level {
        println!("  Level up! {} -> {}", before.level, after.level);
    }
    if verbose {
        print_stats(&after);
    }
    Ok(())
}

/// `lvl task list`
fn cmd_task_list(engine: &Engine, user: UserId) -> Result<()> {
    let tasks = engine.list_tasks(user)?;
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    println!("Tasks ({}):", tasks.len());
    for task in &tasks {
        println!(
            "  [{}] {:<11} d{} {} (project {})",
            task.id, task.status, task.difficulty, task.title, task.project_id
        );
    }
    Ok(())
}

// ── Skills ────────────────────────────────────────────────────────────────────

/// `lvl skill add`
fn cmd_skill_add(engine: &Engine, user: UserId, input: NewSkill) -> Result<()> {
    let skill = engine.create_skill(user, &input)?;
    println!("Added skill {}", skill.id);
    println!("  Name:     {}", skill.name);
    println!("  Category: {}", skill.category);
    println!("  Level:    {} ({})", skill.level, skill.status);
    Ok(())
}

/// `lvl skill update ID --level N`
fn cmd_skill_update(engine: &Engine, user: UserId, skill_id: i64, update: SkillUpdate) -> Result<()> {
    let progress = engine.update_skill(user, SkillId(skill_id), &update)?;
    let skill = &progress.skill;
    println!("Updated skill {}", skill.id);
    println!("  Name:   {}", skill.name);
    println!("  Level:  {} ({})", skill.level, skill.status);
    if progress.xp_awarded > 0 {
        println!("  XP:     +{}", progress.xp_awarded);
    }
    Ok(())
}

/// `lvl skill track --code C --title T`
fn cmd_skill_track(engine: &Engine, code: &str, title: &str, order: i64) -> Result<()> {
    let track = engine.create_track(code, title, order)?;
    println!("Created track '{}'", track.title);
    println!("  ID:   {}", track.id);
    println!("  Code: {}", track.code);
    Ok(())
}

/// `lvl skill node --track T --code C --title T`
fn cmd_skill_node(engine: &Engine, input: NewSkillNode) -> Result<()> {
    let node = engine.create_node(&input)?;
    println!("Created node '{}'", node.title);
    println!("  ID:        {}", node.id);
    println!("  Track:     {}", node.track_id);
    println!("  Max level: {}", node.max_level);
    Ok(())
}

/// `lvl skill list`
fn cmd_skill_list(engine: &Engine, user: UserId) -> Result<()> {
    let skills = engine.list_skills(user)?;
    if skills.is_empty() {
        println!("No skills yet.");
    } else {
        println!("Skills ({}):", skills.len());
        for skill in &skills {
            println!(
                "  [{}] {:<24} {:>3} {} ({})",
                skill.id, skill.name, skill.level, skill.status, skill.category
            );
        }
    }

    let tree = engine.skill_tree()?;
    if !tree.is_empty() {
        println!("Skill tree:");
        for (track, nodes) in &tree {
            println!("  {} [{}]", track.title, track.id);
            for node in nodes {
                println!("    [{}] {} (max {})", node.id, node.title, node.max_level);
            }
        }
    }
    Ok(())
}

// ── Focus ─────────────────────────────────────────────────────────────────────

/// `lvl focus start [--kind K]`
fn cmd_focus_start(
    engine: &Engine,
    user: UserId,
    kind: &str,
    note: &str,
    node: Option<i64>,
) -> Result<()> {
    let kind = FocusKind::parse(kind)?;
    let (session, created) = engine.start_focus(user, kind, note, node)?;
    if created {
        println!("Focus session started");
    } else {
        println!("A focus session is already running");
    }
    print_session(&session);
    Ok(())
}

/// `lvl focus stop [--url U]`
fn cmd_focus_stop(engine: &Engine, user: UserId, url: &str, verbose: bool) -> Result<()> {
    let (session, xp) = engine.stop_focus(user, url)?;
    let Some(session) = session else {
        println!("No active focus session.");
        return Ok(());
    };

    println!("Focus session {} finished", session.id);
    println!("  Duration: {} min", session.duration_seconds / 60);
    if xp > 0 {
        println!("  XP:       +{xp}");
    } else {
        println!("  XP:       none (too short or daily cap reached)");
    }
    if verbose {
        print_stats(&engine.stats(user)?);
    }
    Ok(())
}

/// `lvl focus cancel`
fn cmd_focus_cancel(engine: &Engine, user: UserId) -> Result<()> {
    match engine.cancel_focus(user)? {
        Some(session) => println!("Canceled focus session {}", session.id),
        None => println!("No active focus session."),
    }
    Ok(())
}

/// `lvl focus status`
fn cmd_focus_status(engine: &Engine, user: UserId) -> Result<()> {
    match engine.active_focus(user)? {
        Some(session) => {
            let elapsed = engine.now().saturating_sub(session.started_at) / 60_000_000;
            println!("Focus session running ({elapsed} min)");
            print_session(&session);
        }
        None => println!("No active focus session."),
    }
    Ok(())
}

// ── Boss ──────────────────────────────────────────────────────────────────────

/// `lvl boss status`
fn cmd_boss_status(engine: &Engine, user: UserId) -> Result<()> {
    let boss = engine.boss(user)?;
    println!("Boss: {} (rank {})", boss.name, boss.rank);
    println!("  HP:      {}/{}", boss.hp_current, boss.hp_max);
    println!("  Since:   {}", micros_to_local_display(boss.started_at));
    Ok(())
}

/// `lvl boss attack [--max-events N]`
fn cmd_boss_attack(engine: &Engine, user: UserId, max_events: Option<usize>) -> Result<()> {
    let outcome = engine.attack_boss(user, max_events)?;
    let boss = &outcome.boss;

    if outcome.events_used == 0 {
        println!("No fresh XP to attack with. Go earn some!");
        println!("  {}: {}/{} HP", boss.name, boss.hp_current, boss.hp_max);
        return Ok(());
    }

    println!("Attacked {} with {} event(s)", boss.name, outcome.events_used);
    println!("  Damage:  {}", outcome.damage);
    println!("  HP:      {}/{}", boss.hp_current, boss.hp_max);
    if outcome.defeated {
        println!("  Defeated! Bonus XP: +{}", outcome.bonus_xp);
    }
    Ok(())
}

/// `lvl boss next`
fn cmd_boss_next(engine: &Engine, user: UserId) -> Result<()> {
    let boss = engine.next_boss(user)?;
    println!("New boss: {} (rank {})", boss.name, boss.rank);
    println!("  HP: {}/{}", boss.hp_current, boss.hp_max);
    Ok(())
}

/// `lvl boss history`
fn cmd_boss_history(engine: &Engine, user: UserId, limit: usize) -> Result<()> {
    let runs = engine.boss_history(user, limit)?;
    if runs.is_empty() {
        println!("No bosses yet.");
        return Ok(());
    }
    for run in &runs {
        println!(
            "  [{}] {:<20} {} {:>6}/{:<6} {}",
            run.id, run.name, run.rank, run.hp_current, run.hp_max, run.status
        );
    }
    Ok(())
}

// ── Read models ───────────────────────────────────────────────────────────────

/// `lvl events [--limit N]`
fn cmd_events(engine: &Engine, user: UserId, limit: usize, verbose: bool) -> Result<()> {
    let events = engine.list_events(user, limit)?;
    if events.is_empty() {
        println!("No XP events yet.");
        return Ok(());
    }
    println!("XP events ({}):", events.len());
    for event in &events {
        println!(
            "  {} {:<15} +{:<5} {}",
            micros_to_local_display(event.created_at),
            event.kind,
            event.amount,
            if event.has_source_key() {
                format!("{}:{}", event.source_type, event.source_id)
            } else {
                String::new()
            }
        );
        if verbose && !event.metadata.is_null() {
            println!("      {}", event.metadata);
        }
    }
    Ok(())
}

/// `lvl analytics`
fn cmd_analytics(engine: &Engine, user: UserId) -> Result<()> {
    let summary = engine.analytics(user)?;
    println!("Analytics {} .. {}", summary.from, summary.to);
    println!("  Current streak:   {} day(s)", summary.streak_current);
    println!("  Best streak (30d): {} day(s)", summary.streak_best_30d);

    println!("  XP by kind:");
    if summary.xp_by_kind.is_empty() {
        println!("    (none)");
    }
    for entry in &summary.xp_by_kind {
        println!("    {:<15} {}", entry.kind, entry.xp);
    }

    println!("  XP by day:");
    for day in summary.xp_by_day.iter().filter(|d| d.xp > 0) {
        println!("    {} {}", day.date, day.xp);
    }
    Ok(())
}

/// `lvl dashboard`
fn cmd_dashboard(engine: &Engine, user: UserId) -> Result<()> {
    let dash = engine.dashboard(user)?;
    let today = local_date(engine.now());
    println!("Dashboard ({today})");
    println!("  Level:     {}", dash.level);
    println!("  XP:        {} (next level step {})", dash.xp, dash.xp_to_next_level);
    println!("  Rank:      {}", dash.rank);
    println!("  Dev score: {}", dash.dev_score);
    println!("  Workouts this week: {}", dash.workouts_this_week);
    println!("  Tasks done:         {}", dash.tasks_done);
    println!("  Skills in progress: {}", dash.skills_in_progress);
    Ok(())
}

// ── Assistant ─────────────────────────────────────────────────────────────────

fn completion_provider(config: &Config) -> Box<dyn CompletionProvider> {
    match OllamaProvider::from_config(config) {
        Ok(provider) => Box::new(provider),
        Err(e) => {
            log::warn!("assistant backend unavailable: {e}");
            Box::new(DisabledProvider)
        }
    }
}

/// `lvl ai chat "MESSAGE"`
fn cmd_ai_chat(engine: &Engine, user: UserId, message: &str, verbose: bool) -> Result<()> {
    let provider = completion_provider(engine.config());
    let reply = engine
        .chat(user, provider.as_ref(), message, &[])
        .context("assistant request failed")?;

    println!("{}", reply.reply);
    if verbose {
        println!();
        println!("  Model: {}", reply.model);
    }

    if let (Some(action), Some(token)) = (reply.proposed_action, reply.action_token) {
        println!();
        println!("Proposed action: {}", action.name);
        if !action.args.is_null() {
            println!("  Args:  {}", action.args);
        }
        println!("  Confirm with: lvl --user <you> ai act {token}");
    }
    Ok(())
}

/// `lvl ai act TOKEN`
fn cmd_ai_act(engine: &Engine, user: UserId, token: &str) -> Result<()> {
    let outcome = engine
        .act(user, token)
        .context("failed to execute assistant action")?;
    println!("Executed {}", outcome.action.name);
    let pretty = serde_json::to_string_pretty(&outcome.result)
        .context("failed to format action result")?;
    println!("{pretty}");
    Ok(())
}

/// `lvl ai profile [--preferred-name N ...]`
fn cmd_ai_profile(engine: &Engine, user: UserId, update: ProfileUpdate) -> Result<()> {
    let profile = if update == ProfileUpdate::default() {
        engine.assistant_profile(user)?
    } else {
        engine.update_assistant_profile(user, &update)?
    };
    println!("Assistant profile");
    println!("  Preferred name: {}", profile.preferred_name);
    println!("  Address as:     {}", profile.how_to_address);
    println!("  About me:       {}", profile.about_me);
    println!("  Persona:        {}", profile.persona());
    Ok(())
}
