//! Integration tests for the ddlkit CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ORIGIN: &str = "00000000-0000-0000-0000-000000000000";

/// Get the ddlkit binary
#[allow(deprecated)]
fn ddlkit_cmd() -> Command {
    Command::cargo_bin("ddlkit").unwrap()
}

fn users_ddl(email_not_null: bool) -> Value {
    json!([
        {"entityType": "table", "schema": "public", "name": "users"},
        {"entityType": "column", "table": "users", "name": "id", "type": "integer", "notNull": true},
        {"entityType": "column", "table": "users", "name": "email", "type": "text", "notNull": email_not_null}
    ])
}

fn write_snapshot(dir: &Path, tag: &str, id: &str, prev: &str, ddl: Value) {
    let folder = dir.join(tag);
    fs::create_dir_all(&folder).unwrap();
    let snapshot = json!({
        "version": "8",
        "dialect": "postgresql",
        "id": id,
        "prevIds": [prev],
        "ddl": ddl,
        "renames": []
    });
    fs::write(
        folder.join("snapshot.json"),
        serde_json::to_string_pretty(&snapshot).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_help_command() {
    ddlkit_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema diffing and migration planning"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("drift"));
}

#[test]
fn test_version_command() {
    ddlkit_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_generate_help() {
    ddlkit_cmd()
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--allow-data-loss"))
        .stdout(predicate::str::contains("--rename-mode"));
}

#[test]
fn test_init_creates_project_structure() {
    let temp_dir = TempDir::new().unwrap();

    ddlkit_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "app", "--dialect", "sqlite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("initialized successfully"));

    let project = temp_dir.path().join("app");
    assert!(project.join("ddlkit.toml").exists());
    assert!(project.join("ddlkit").join("schema.json").exists());
    assert!(project.join("ddlkit").join("migrations").is_dir());

    let config = fs::read_to_string(project.join("ddlkit.toml")).unwrap();
    assert!(config.contains("dialect = \"sqlite\""));
}

#[test]
fn test_generate_after_init() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path();

    ddlkit_cmd()
        .current_dir(project)
        .arg("init")
        .assert()
        .success();

    ddlkit_cmd()
        .current_dir(project)
        .args(["generate", "--name", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created migration"));

    let migrations: Vec<_> = fs::read_dir(project.join("ddlkit").join("migrations"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(migrations.len(), 1);
    let sql = fs::read_to_string(migrations[0].join("migration.sql")).unwrap();
    assert!(sql.contains("CREATE TABLE \"users\""));
    assert!(migrations[0].join("snapshot.json").exists());

    ddlkit_cmd()
        .current_dir(project)
        .args(["generate", "--name", "again"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No schema changes detected"));
}

#[test]
fn test_generate_missing_schema_fails() {
    let temp_dir = TempDir::new().unwrap();

    ddlkit_cmd()
        .current_dir(temp_dir.path())
        .args(["generate", "--schema", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_diff_prints_sql() {
    let temp_dir = TempDir::new().unwrap();
    let from = temp_dir.path().join("from.json");
    let to = temp_dir.path().join("to.json");
    fs::write(&from, json!({"dialect": "postgresql", "ddl": []}).to_string()).unwrap();
    fs::write(
        &to,
        json!({"dialect": "postgresql", "ddl": users_ddl(false)}).to_string(),
    )
    .unwrap();

    ddlkit_cmd()
        .args(["diff", from.to_str().unwrap(), to.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE \"users\""));

    ddlkit_cmd()
        .args([
            "diff",
            from.to_str().unwrap(),
            to.to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"create_table\""));
}

#[test]
fn test_check_reports_conflicting_branches() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("migrations");

    write_snapshot(&out, "20250101000000_init", "p", ORIGIN, users_ddl(false));
    write_snapshot(&out, "20250102000000_drop_users", "a", "p", json!([]));
    write_snapshot(&out, "20250102000001_strict_email", "b", "p", users_ddl(true));

    ddlkit_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "--out", out.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Dropping a table conflicts"))
        .stderr(predicate::str::contains("1 non-commutative branch pair(s)"));
}

#[test]
fn test_check_passes_for_linear_history() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("migrations");

    write_snapshot(&out, "20250101000000_init", "p", ORIGIN, users_ddl(false));
    write_snapshot(&out, "20250102000000_strict_email", "a", "p", users_ddl(true));

    ddlkit_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "--out", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("All branches commute"));
}
