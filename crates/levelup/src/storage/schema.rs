//! SQLite schema.
//!
//! Invariants that must hold under concurrent writers are declared here as
//! constraints rather than left to application code.

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = r"
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  username TEXT NOT NULL UNIQUE CHECK (length(username) > 0),
  created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_stats (
  user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
  level INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
  xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
  xp_to_next_level INTEGER NOT NULL DEFAULT 100,
  strength INTEGER NOT NULL DEFAULT 1 CHECK (strength >= 1),
  agility INTEGER NOT NULL DEFAULT 1 CHECK (agility >= 1),
  intelligence INTEGER NOT NULL DEFAULT 1 CHECK (intelligence >= 1),
  vitality INTEGER NOT NULL DEFAULT 1 CHECK (vitality >= 1),
  stat_points INTEGER NOT NULL DEFAULT 0 CHECK (stat_points >= 0),
  dev_score INTEGER NOT NULL DEFAULT 0 CHECK (dev_score >= 0),
  rank TEXT NOT NULL DEFAULT 'E' CHECK (rank IN ('E','D','C','B','A','S')),
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS xp_events (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  kind TEXT NOT NULL,
  amount INTEGER NOT NULL,
  source_type TEXT NOT NULL DEFAULT '',
  source_id TEXT NOT NULL DEFAULT '',
  source_url TEXT NOT NULL DEFAULT '',
  metadata TEXT NOT NULL DEFAULT '{}',
  occurred_at INTEGER,
  created_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uniq_xp_event_source_per_user
  ON xp_events(user_id, source_type, source_id)
  WHERE source_type <> '' AND source_id <> '';
CREATE INDEX IF NOT EXISTS idx_xp_events_user_created
  ON xp_events(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_xp_events_user_kind_created
  ON xp_events(user_id, kind, created_at);

CREATE TRIGGER IF NOT EXISTS trg_xp_events_no_update
BEFORE UPDATE ON xp_events
BEGIN
  SELECT RAISE(FAIL, 'xp_events is append-only');
END;

CREATE TRIGGER IF NOT EXISTS trg_xp_events_no_delete
BEFORE DELETE ON xp_events
BEGIN
  SELECT RAISE(FAIL, 'xp_events is append-only');
END;

CREATE TABLE IF NOT EXISTS boss_runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  name TEXT NOT NULL,
  rank TEXT NOT NULL DEFAULT 'E',
  hp_max INTEGER NOT NULL CHECK (hp_max >= 0),
  hp_current INTEGER NOT NULL CHECK (hp_current >= 0 AND hp_current <= hp_max),
  status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active','defeated')),
  started_at INTEGER NOT NULL,
  defeated_at INTEGER,
  created_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uniq_active_boss_per_user
  ON boss_runs(user_id) WHERE status = 'active';

CREATE TABLE IF NOT EXISTS boss_damage (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  boss_id INTEGER NOT NULL REFERENCES boss_runs(id) ON DELETE CASCADE,
  xp_event_id INTEGER NOT NULL UNIQUE REFERENCES xp_events(id),
  amount INTEGER NOT NULL CHECK (amount >= 0),
  created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_boss_damage_boss ON boss_damage(boss_id);

CREATE TABLE IF NOT EXISTS skill_tracks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  code TEXT NOT NULL UNIQUE,
  title TEXT NOT NULL,
  ord INTEGER NOT NULL DEFAULT 0,
  created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS skill_nodes (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  track_id INTEGER NOT NULL REFERENCES skill_tracks(id) ON DELETE CASCADE,
  code TEXT NOT NULL UNIQUE,
  title TEXT NOT NULL,
  description TEXT NOT NULL DEFAULT '',
  max_level INTEGER NOT NULL DEFAULT 100 CHECK (max_level BETWEEN 1 AND 100),
  ord INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS skills (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  node_id INTEGER REFERENCES skill_nodes(id) ON DELETE SET NULL,
  category TEXT NOT NULL DEFAULT '',
  name TEXT NOT NULL,
  level INTEGER NOT NULL DEFAULT 0 CHECK (level BETWEEN 0 AND 100),
  mastery_xp INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL DEFAULT 'learning' CHECK (status IN ('learning','practicing','mastered')),
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  UNIQUE (user_id, category, name)
);

CREATE UNIQUE INDEX IF NOT EXISTS uniq_skill_node_per_user
  ON skills(user_id, node_id) WHERE node_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS focus_sessions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  kind TEXT NOT NULL DEFAULT 'coding',
  note TEXT NOT NULL DEFAULT '',
  skill_node_id INTEGER REFERENCES skill_nodes(id) ON DELETE SET NULL,
  started_at INTEGER NOT NULL,
  ended_at INTEGER,
  canceled INTEGER NOT NULL DEFAULT 0 CHECK (canceled IN (0, 1)),
  duration_seconds INTEGER NOT NULL DEFAULT 0,
  xp_awarded INTEGER NOT NULL DEFAULT 0,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uniq_active_focus_session_per_user
  ON focus_sessions(user_id) WHERE ended_at IS NULL AND canceled = 0;

CREATE TABLE IF NOT EXISTS workouts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  kind TEXT NOT NULL,
  duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 1),
  intensity INTEGER NOT NULL CHECK (intensity BETWEEN 1 AND 10),
  date TEXT NOT NULL,
  comment TEXT NOT NULL DEFAULT '',
  created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS learning_logs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  title TEXT NOT NULL,
  description TEXT NOT NULL DEFAULT '',
  date TEXT NOT NULL,
  created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  name TEXT NOT NULL,
  is_commercial INTEGER NOT NULL DEFAULT 0 CHECK (is_commercial IN (0, 1)),
  description TEXT NOT NULL DEFAULT '',
  stack TEXT NOT NULL DEFAULT '',
  role TEXT NOT NULL DEFAULT '',
  status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active','paused','done')),
  created_at INTEGER NOT NULL,
  UNIQUE (user_id, name)
);

CREATE TABLE IF NOT EXISTS tasks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
  title TEXT NOT NULL,
  kind TEXT NOT NULL DEFAULT 'main' CHECK (kind IN ('daily','main','internship')),
  status TEXT NOT NULL DEFAULT 'todo' CHECK (status IN ('todo','in_progress','done')),
  difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5),
  deadline TEXT,
  notes TEXT NOT NULL DEFAULT '',
  completed_at INTEGER,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS assistant_profiles (
  user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
  preferred_name TEXT NOT NULL DEFAULT '',
  how_to_address TEXT NOT NULL DEFAULT '',
  about_me TEXT NOT NULL DEFAULT '',
  assistant_persona TEXT NOT NULL DEFAULT '',
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);
";

/// Create all tables, indexes and triggers, and record the schema version.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA_V1)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
