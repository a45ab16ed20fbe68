//! End-to-end tests of the codemigrate binary that do not need a nightly toolchain.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NOOP_MIGRATION: &str = "use codemigrate_runtime::Transaction;\n\n\
    pub fn Up_5(_tx: &mut Transaction<'_>) {}\n\n\
    pub fn Down_5(_tx: &mut Transaction<'_>) {}\n";

fn codemigrate() -> Command {
    let mut cmd = Command::cargo_bin("codemigrate").expect("codemigrate binary");
    cmd.env_remove("CODEMIGRATE_ENV");
    cmd
}

fn create_project(exec_section: &str) -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();
    fs::create_dir_all(root.join("db/migrations")).unwrap();
    fs::create_dir_all(root.join("workspaces")).unwrap();
    fs::write(root.join("db/migrations/5_noop.rs"), NOOP_MIGRATION).unwrap();
    fs::write(
        root.join("codemigrate.toml"),
        format!(
            r#"
[environments.development]
driver = "sqlite3"
open = "app.db"

[environments.legacy]
driver = "mysql"
open = "user:pw@/app"

{exec_section}
"#
        ),
    )
    .unwrap();
    td
}

fn workspaces_left(root: &Path) -> usize {
    fs::read_dir(root.join("workspaces")).unwrap().count()
}

#[test]
fn dialects_lists_builtins() {
    codemigrate()
        .arg("dialects")
        .assert()
        .success()
        .stdout(predicate::str::contains("postgres"))
        .stdout(predicate::str::contains("redshift"))
        .stdout(predicate::str::contains("sqlite3"))
        .stdout(predicate::str::contains("mysql      mysql  (render only)"));
}

#[test]
fn dialects_json_is_parseable() {
    let out = codemigrate()
        .args(["dialects", "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["name"].as_str())
        .collect();
    assert_eq!(names, vec!["mysql", "postgres", "redshift", "sqlite3"]);
}

#[test]
fn render_prints_driver_for_migration_in_migrations_dir() {
    let temp = create_project("");
    codemigrate()
        .current_dir(temp.path())
        .args(["render", "5_noop.rs"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\n[package]\n"))
        .stdout(predicate::str::contains("features = [\"sqlite\"]"))
        .stdout(predicate::str::contains("migration::Up_5(&mut tx)"));
}

#[test]
fn render_down_to_file() {
    let temp = create_project("");
    let out = temp.path().join("driver.rs");
    codemigrate()
        .current_dir(temp.path())
        .args(["render", "db/migrations/5_noop.rs", "--direction", "down", "-o"])
        .arg(&out)
        .assert()
        .success();
    let driver = fs::read_to_string(out).unwrap();
    assert!(driver.contains("migration::Down_5(&mut tx)"));
    assert!(driver.contains("const DIRECTION: Direction = Direction::Down;"));
}

#[test]
fn render_with_environment_transport() {
    let temp = create_project("");
    codemigrate()
        .current_dir(temp.path())
        .args(["render", "5_noop.rs", "--transport", "environment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("decode_from_env(SNAPSHOT_VAR)"));
}

#[test]
fn unknown_environment_fails() {
    let temp = create_project("");
    codemigrate()
        .current_dir(temp.path())
        .args(["--env", "production", "render", "5_noop.rs"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("environment 'production' is not defined"));
}

#[test]
fn mysql_environment_cannot_render() {
    let temp = create_project("");
    codemigrate()
        .current_dir(temp.path())
        .args(["-e", "legacy", "render", "5_noop.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no `mysql` backend"));
}

#[test]
fn missing_entry_point_fails() {
    let temp = create_project("");
    codemigrate()
        .current_dir(temp.path())
        .args(["render", "5_noop.rs", "--version-id", "6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Up_6"));
}

#[test]
fn migration_without_version_needs_version_id() {
    let temp = create_project("");
    fs::write(
        temp.path().join("db/migrations/add_users.rs"),
        "pub fn Up_9(_tx: &mut codemigrate_runtime::Transaction<'_>) {}\n",
    )
    .unwrap();
    codemigrate()
        .current_dir(temp.path())
        .args(["render", "add_users.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("numeric version prefix"));
    codemigrate()
        .current_dir(temp.path())
        .args(["render", "add_users.rs", "--version-id", "9"])
        .assert()
        .success();
}

#[test]
fn missing_migration_fails() {
    let temp = create_project("");
    codemigrate()
        .current_dir(temp.path())
        .args(["render", "7_missing.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[cfg(unix)]
#[test]
fn run_reports_success_and_removes_workspace() {
    let temp = create_project(
        r#"
[exec]
toolchain = "sh"
toolchain_args = ["-c", "test -f codemigrate_driver.rs && test -f 5_noop.rs", "sh"]
workspace_dir = "workspaces"
"#,
    );
    codemigrate()
        .current_dir(temp.path())
        .args(["run", "5_noop.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK   5 up via Up_5"));
    assert_eq!(workspaces_left(temp.path()), 0);
}

#[cfg(unix)]
#[test]
fn run_json_report() {
    let temp = create_project(
        r#"
[exec]
toolchain = "true"
toolchain_args = []
"#,
    );
    let out = codemigrate()
        .current_dir(temp.path())
        .args(["run", "5_noop.rs", "--direction", "down", "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["version"], 5);
    assert_eq!(report["direction"], "down");
    assert_eq!(report["version_applied"], false);
    assert_eq!(report["migration_sha256"].as_str().unwrap().len(), 64);
}

#[cfg(unix)]
#[test]
fn run_passes_driver_exit_code_through() {
    let temp = create_project(
        r#"
[exec]
toolchain = "sh"
toolchain_args = ["-c", "exit 3", "sh"]
workspace_dir = "workspaces"
"#,
    );
    codemigrate()
        .current_dir(temp.path())
        .args(["run", "5_noop.rs"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("exited with status 3"));
    assert_eq!(workspaces_left(temp.path()), 0);
}

#[cfg(unix)]
#[test]
fn run_timeout_kills_driver() {
    let temp = create_project(
        r#"
[exec]
toolchain = "sh"
toolchain_args = ["-c", "exec sleep 30", "sh"]
workspace_dir = "workspaces"
"#,
    );
    codemigrate()
        .current_dir(temp.path())
        .args(["run", "5_noop.rs", "--timeout-secs", "1"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("timed out"));
    assert_eq!(workspaces_left(temp.path()), 0);
}

#[test]
fn run_with_missing_toolchain_is_spawn_error() {
    let temp = create_project(
        r#"
[exec]
toolchain = "codemigrate-no-such-toolchain"
workspace_dir = "workspaces"
"#,
    );
    codemigrate()
        .current_dir(temp.path())
        .args(["run", "5_noop.rs"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("codemigrate-no-such-toolchain"));
    assert_eq!(workspaces_left(temp.path()), 0);
}
