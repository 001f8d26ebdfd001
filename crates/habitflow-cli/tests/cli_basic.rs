//! Basic CLI E2E tests.
//!
//! Each test runs the built binary with HOME pointed at a fresh temp dir so
//! config and database never leak between tests.

use std::process::Command;

use serde_json::Value;

/// Run a CLI command in an isolated home and return (stdout, stderr, code).
fn run_cli(home: &tempfile::TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_habitflow-cli"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("HABITFLOW_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Prefix `args` with `--tz UTC`.
fn utc<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut full = vec!["--tz", "UTC"];
    full.extend_from_slice(args);
    full
}

fn run_json(home: &tempfile::TempDir, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_config_list_has_defaults() {
    let home = tempfile::tempdir().unwrap();
    let config = run_json(&home, &["config", "list"]);
    assert_eq!(config["user_id"], "local");
    assert_eq!(config["truth"]["include_legacy_fallback"], true);
}

#[test]
fn test_config_set_and_get() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(&home, &["config", "set", "timezone", "Europe/Paris"]);
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(&home, &["config", "get", "timezone"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "Europe/Paris");

    let (_, _, code) = run_cli(&home, &["config", "set", "timezone", "Nowhere/Special"]);
    assert_ne!(code, 0);
}

#[test]
fn test_missing_timezone_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(&home, &["day"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("timezone"), "unexpected stderr: {stderr}");
}

#[test]
fn test_habit_log_and_day_view() {
    let home = tempfile::tempdir().unwrap();
    run_json(&home, &utc(&["habit", "add", "Read", "--id", "read"]));
    run_json(&home, &utc(&["habit", "add", "Walk", "--id", "walk"]));
    let entry = run_json(&home, &utc(&["log", "read", "--date", "2025-01-15"]));
    assert_eq!(entry["habitId"], "read");
    assert_eq!(entry["dayKey"], "2025-01-15");

    let day = run_json(&home, &utc(&["day", "--date", "2025-01-15"]));
    assert_eq!(day["dayKey"], "2025-01-15");
    let habits = day["habits"].as_array().unwrap();
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0]["habit"]["id"], "read");
    assert_eq!(habits[0]["isComplete"], true);
    assert_eq!(habits[1]["isComplete"], false);
}

#[test]
fn test_delete_entry_hides_it_from_completion() {
    let home = tempfile::tempdir().unwrap();
    run_json(&home, &utc(&["habit", "add", "Read", "--id", "read"]));
    let entry = run_json(&home, &utc(&["log", "read", "--date", "2025-01-15"]));
    let id = entry["id"].as_str().unwrap().to_string();

    let (stdout, _, code) = run_cli(&home, &utc(&["delete-entry", id.as_str()]));
    assert_eq!(code, 0);
    assert!(stdout.contains("deleted"));

    let (_, _, code) = run_cli(&home, &utc(&["delete-entry", id.as_str()]));
    assert_ne!(code, 0);

    let views = run_json(&home, &utc(&["entries", "read"]));
    assert_eq!(views.as_array().unwrap().len(), 1);
    assert!(views[0]["deletedAt"].is_string());

    let day = run_json(&home, &utc(&["day", "--date", "2025-01-15"]));
    assert_eq!(day["habits"][0]["isComplete"], false);
}

#[test]
fn test_goal_progress_output() {
    let home = tempfile::tempdir().unwrap();
    run_json(&home, &utc(&["habit", "add", "Run", "--id", "run", "--unit", "miles"]));
    run_json(
        &home,
        &utc(&[
            "goal", "add", "Run 100 miles", "--type", "cumulative", "--id", "miles", "--target", "100",
            "--unit", "miles", "--link", "run",
        ]),
    );
    run_json(&home, &utc(&["log", "run", "--value", "12", "--unit", "miles"]));
    run_json(&home, &utc(&["goal", "log-manual", "miles", "3"]));

    let progress = run_json(&home, &utc(&["goal", "progress", "miles"]));
    assert_eq!(progress["progress"]["currentValue"], 15.0);
    assert_eq!(progress["progress"]["percent"], 15);
    assert_eq!(progress["progress"]["lastSevenDays"].as_array().unwrap().len(), 7);

    let all = run_json(&home, &utc(&["goal", "progress"]));
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[test]
fn test_momentum_and_streak() {
    let home = tempfile::tempdir().unwrap();
    run_json(&home, &utc(&["habit", "add", "Read", "--id", "read"]));
    for d in ["2025-01-13", "2025-01-14", "2025-01-15"] {
        run_json(&home, &utc(&["log", "read", "--date", d]));
    }

    let momentum = run_json(&home, &utc(&["momentum", "global", "--date", "2025-01-15"]));
    assert_eq!(momentum["windowDays"], 7);
    assert_eq!(momentum["activeDays"], 3);
    assert_eq!(momentum["state"], "building");
    assert!(momentum["copy"].is_string());

    let streak = run_json(&home, &utc(&["streak", "read", "--date", "2025-01-15"]));
    assert_eq!(streak["current"], 3);
    assert_eq!(streak["best"], 3);
}
