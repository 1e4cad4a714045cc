//! Integration tests for the CLI binary.
//!
//! Runs the `lvl` binary against a throwaway `LEVELUP_HOME`.
//!
//! This test is registered as a [[test]] in the levelup-cli crate
//! so that CARGO_BIN_EXE_lvl is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `lvl` binary, isolated in `home`.
fn lvl_binary(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lvl"));
    cmd.env("LEVELUP_HOME", home)
        .env("LEVELUP_SECRET", "0123456789abcdef0123456789abcdef")
        .env_remove("RUST_LOG");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    lvl_binary(home)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute lvl {args:?}: {e}"))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cli_responds_to_help() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--help"]);
    assert_success(&output, "lvl --help");

    let stdout = stdout(&output);
    assert!(
        stdout.contains("LevelUp") || stdout.contains("Usage"),
        "lvl --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--version"]);
    assert_success(&output, "lvl --version");
    assert!(stdout(&output).contains("0.3"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--nonexistent-flag"]);
    assert!(!output.status.success());
}

#[test]
fn cli_task_flow_awards_xp() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();

    let output = run(home, &["project", "add", "--name", "Website"]);
    assert_success(&output, "project add");
    assert!(stdout(&output).contains("Created project 'Website'"));
    assert!(home.join("levelup.db").exists());

    let output = run(
        home,
        &["task", "add", "--project", "1", "--title", "Landing page", "--difficulty", "2"],
    );
    assert_success(&output, "task add");
    assert!(stdout(&output).contains("100 XP on completion"));

    let output = run(home, &["task", "complete", "1"]);
    assert_success(&output, "task complete");
    let out = stdout(&output);
    assert!(out.contains("+100"), "got: {out}");
    assert!(out.contains("Level up! 1 -> 2"), "got: {out}");

    let output = run(home, &["task", "complete", "1"]);
    assert_success(&output, "repeat task complete");
    assert!(stdout(&output).contains("already collected"));

    let output = run(home, &["hero", "show"]);
    assert_success(&output, "hero show");
    let out = stdout(&output);
    assert!(out.contains("Level:      2"), "got: {out}");
    assert!(out.contains("Stat points: 5"), "got: {out}");

    let output = run(home, &["events"]);
    assert_success(&output, "events");
    assert!(stdout(&output).contains("task_complete"));
}

#[test]
fn cli_users_are_separate() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();

    let output = run(
        home,
        &["--user", "ann", "workout", "add", "--type", "run", "--minutes", "20", "--intensity", "5"],
    );
    assert_success(&output, "workout add");
    assert!(stdout(&output).contains("+100"));

    let output = run(home, &["--user", "ben", "dashboard"]);
    assert_success(&output, "dashboard");
    let out = stdout(&output);
    assert!(out.contains("XP:        0"), "got: {out}");
    assert!(out.contains("Workouts this week: 0"), "got: {out}");
}

#[test]
fn cli_focus_and_boss_status() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();

    let output = run(home, &["focus", "status"]);
    assert_success(&output, "focus status");
    assert!(stdout(&output).contains("No active focus session."));

    let output = run(home, &["focus", "start", "--kind", "debugging"]);
    assert_success(&output, "focus start");
    assert!(stdout(&output).contains("Focus session started"));

    let output = run(home, &["focus", "start"]);
    assert_success(&output, "second focus start");
    assert!(stdout(&output).contains("already running"));

    let output = run(home, &["focus", "cancel"]);
    assert_success(&output, "focus cancel");
    assert!(stdout(&output).contains("Canceled focus session"));

    let output = run(home, &["boss", "status"]);
    assert_success(&output, "boss status");
    let out = stdout(&output);
    assert!(out.contains("Regression Slime"), "got: {out}");
    assert!(out.contains("1240/1240"), "got: {out}");

    let output = run(home, &["boss", "attack"]);
    assert_success(&output, "boss attack");
    assert!(stdout(&output).contains("No fresh XP"));
}

#[test]
fn cli_reports_validation_errors() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path();

    let output = run(
        home,
        &["workout", "add", "--type", "run", "--minutes", "10", "--intensity", "11"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("intensity"), "got: {stderr}");

    let output = run(home, &["focus", "start", "--kind", "napping"]);
    assert!(!output.status.success());

    let output = run(home, &["hero", "allocate", "--strength", "1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Insufficient stat points"), "got: {stderr}");

    let output = run(home, &["ai", "act", "not-a-token"]);
    assert!(!output.status.success());
}
