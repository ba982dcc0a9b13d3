use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;

const ENV_VARS: [&str; 7] = [
    "TICK_URL",
    "TICK_ANON_KEY",
    "TICK_TABLE",
    "TICK_SCOPE",
    "TICK_PASSWORD",
    "TICK_LOG",
    "HOME",
];

fn tick_command(home: &Path) -> Command {
    let binary = assert_cmd::cargo::cargo_bin!("tick");
    let mut cmd = Command::new(binary);
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("TICK_HOME", home);
    cmd
}

fn run_tick(home: &Path, args: &[&str]) -> Output {
    let mut cmd = tick_command(home);
    cmd.arg("--format").arg("json");
    cmd.args(args);
    cmd.output().expect("tick command executes")
}

fn run_tick_ok(home: &Path, args: &[&str]) -> Output {
    let output = run_tick(home, args);
    assert!(
        output.status.success(),
        "tick {:?} failed:\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn run_tick_json(home: &Path, args: &[&str]) -> Value {
    let output = run_tick_ok(home, args);
    serde_json::from_slice(&output.stdout).expect("valid json stdout")
}

fn run_tick_err_json(home: &Path, args: &[&str]) -> Value {
    let output = run_tick(home, args);
    assert!(
        !output.status.success(),
        "expected tick {:?} to fail, but it succeeded:\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    let json_line = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    serde_json::from_str(json_line).expect("valid json error line in stderr")
}

fn write_session(home: &Path, user: &str, expires_at: i64) {
    fs::create_dir_all(home).unwrap();
    let session = json!({
        "access_token": "jwt",
        "expires_at": expires_at,
        "user": { "id": user, "email": format!("{user}@example.com") },
    });
    fs::write(home.join("session.json"), session.to_string()).unwrap();
}

#[test]
fn memory_backend_signs_in_as_demo_user() {
    let dir = tempdir().unwrap();

    let whoami = run_tick_json(dir.path(), &["--backend", "memory", "whoami"]);
    assert_eq!(whoami["signed_in"], true);
    assert_eq!(whoami["user"]["id"], "local-demo");
}

#[test]
fn add_returns_the_confirmed_row() {
    let dir = tempdir().unwrap();

    let task = run_tick_json(
        dir.path(),
        &["--backend", "memory", "add", "Buy milk", "--due", "2026-03-12T09:00:00Z"],
    );
    assert_eq!(task["title"], "Buy milk");
    assert_eq!(task["is_completed"], false);
    assert_eq!(task["assigned_to"], "local-demo");
    assert_eq!(task["created_by"], "local-demo");
    assert_eq!(task["due_date"], "2026-03-12T09:00:00Z");
    assert!(task["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[test]
fn add_assigns_to_another_user() {
    let dir = tempdir().unwrap();

    let task = run_tick_json(
        dir.path(),
        &["--backend", "memory", "add", "Review PR", "--assign-to", "u2"],
    );
    assert_eq!(task["assigned_to"], "u2");
    assert_eq!(task["created_by"], "local-demo");
    assert!(task.get("due_date").is_none());
}

#[test]
fn blank_title_is_a_validation_error() {
    let dir = tempdir().unwrap();

    let err = run_tick_err_json(dir.path(), &["--backend", "memory", "add", "   "]);
    assert_eq!(err["error"], "validation_error");
    assert_eq!(err["message"], "task cannot be empty");
}

#[test]
fn unparseable_due_date_is_rejected() {
    let dir = tempdir().unwrap();

    let err = run_tick_err_json(
        dir.path(),
        &["--backend", "memory", "add", "Pay rent", "--due", "next friday"],
    );
    assert_eq!(err["error"], "invalid_date");
}

#[test]
fn fresh_memory_backend_lists_nothing() {
    let dir = tempdir().unwrap();

    let tasks = run_tick_json(dir.path(), &["--backend", "memory", "list", "--filter", "overdue"]);
    assert_eq!(tasks, json!([]));
}

#[test]
fn deleting_unknown_task_reports_remote_error() {
    let dir = tempdir().unwrap();

    let err = run_tick_err_json(dir.path(), &["--backend", "memory", "delete", "42"]);
    assert_eq!(err["error"], "remote_error");
    assert_eq!(err["message"], "no task with id 42");
}

#[test]
fn toggling_unknown_task_is_not_found() {
    let dir = tempdir().unwrap();

    let err = run_tick_err_json(dir.path(), &["--backend", "memory", "toggle", "42"]);
    assert_eq!(err["error"], "task_not_found");
}

#[test]
fn malformed_task_id_is_rejected() {
    let dir = tempdir().unwrap();

    let err = run_tick_err_json(dir.path(), &["--backend", "memory", "toggle", "a b"]);
    assert_eq!(err["error"], "invalid_task_id");
}

#[test]
fn rest_backend_requires_configuration() {
    let dir = tempdir().unwrap();
    write_session(dir.path(), "u1", 4_000_000_000);

    let err = run_tick_err_json(dir.path(), &["list"]);
    assert_eq!(err["error"], "not_configured");
}

#[test]
fn init_writes_config_used_by_later_commands() {
    let dir = tempdir().unwrap();

    let written = run_tick_json(
        dir.path(),
        &[
            "init",
            "--url",
            "http://127.0.0.1:1/",
            "--anon-key",
            "anon",
            "--scope",
            "all",
        ],
    );
    assert_eq!(written["url"], "http://127.0.0.1:1");
    assert_eq!(written["table"], "todos");
    assert_eq!(written["scope"], "all");

    let config: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("config.json")).unwrap())
            .unwrap();
    assert_eq!(config["anon_key"], "anon");

    // Configured but nothing listens there.
    let err = run_tick_err_json(dir.path(), &["list"]);
    assert_eq!(err["error"], "remote_error");
}

#[test]
fn signed_out_fetch_is_empty_and_add_needs_session() {
    let dir = tempdir().unwrap();
    run_tick_ok(
        dir.path(),
        &["init", "--url", "http://127.0.0.1:1", "--anon-key", "anon"],
    );

    let tasks = run_tick_json(dir.path(), &["list"]);
    assert_eq!(tasks, json!([]));

    let err = run_tick_err_json(dir.path(), &["add", "Buy milk"]);
    assert_eq!(err["error"], "no_session");
}

#[test]
fn whoami_reads_stored_session() {
    let dir = tempdir().unwrap();
    write_session(dir.path(), "u1", 4_000_000_000);

    let whoami = run_tick_json(dir.path(), &["whoami"]);
    assert_eq!(whoami["signed_in"], true);
    assert_eq!(whoami["user"]["email"], "u1@example.com");
}

#[test]
fn expired_session_is_ignored() {
    let dir = tempdir().unwrap();
    write_session(dir.path(), "u1", 1_000);

    let whoami = run_tick_json(dir.path(), &["whoami"]);
    assert_eq!(whoami, json!({ "signed_in": false }));
}

#[test]
fn logout_clears_stored_session_even_when_server_is_unreachable() {
    let dir = tempdir().unwrap();
    run_tick_ok(
        dir.path(),
        &["init", "--url", "http://127.0.0.1:1", "--anon-key", "anon"],
    );
    write_session(dir.path(), "u1", 4_000_000_000);

    let out = run_tick_json(dir.path(), &["logout"]);
    assert_eq!(out, json!({ "signed_in": false }));
    assert!(!dir.path().join("session.json").exists());
}

#[test]
fn logout_removes_an_unreadable_session_file() {
    let dir = tempdir().unwrap();
    run_tick_ok(
        dir.path(),
        &["init", "--url", "http://127.0.0.1:1", "--anon-key", "anon"],
    );
    fs::write(dir.path().join("session.json"), "{not json").unwrap();

    let whoami = run_tick_json(dir.path(), &["whoami"]);
    assert_eq!(whoami, json!({ "signed_in": false }));

    let out = run_tick_json(dir.path(), &["logout"]);
    assert_eq!(out, json!({ "signed_in": false }));
    assert!(!dir.path().join("session.json").exists());
}

#[test]
fn pretty_errors_are_plain_text() {
    let dir = tempdir().unwrap();

    assert_cmd::Command::from_std(tick_command(dir.path()))
        .args(["--pretty", "--backend", "memory", "add", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: task cannot be empty"));
}

#[test]
fn pretty_add_confirms_on_stderr() {
    let dir = tempdir().unwrap();

    assert_cmd::Command::from_std(tick_command(dir.path()))
        .args(["--pretty", "--backend", "memory", "add", "Buy milk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ ] Buy milk"))
        .stderr(predicate::str::contains("Task added successfully!"));
}
