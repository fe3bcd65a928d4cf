//! Command-line behaviour of the `filesync` binary

#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

struct Roots {
    _temp_dir: TempDir,
    local: std::path::PathBuf,
    remote: std::path::PathBuf,
}

fn roots() -> Roots {
    let temp_dir = TempDir::new().unwrap();
    let local = temp_dir.path().join("local");
    let remote = temp_dir.path().join("remote");
    fs::create_dir(&local).unwrap();
    fs::create_dir(&remote).unwrap();
    Roots {
        _temp_dir: temp_dir,
        local,
        remote,
    }
}

fn filesync() -> Command {
    Command::cargo_bin("filesync").unwrap()
}

#[test]
fn test_missing_arguments_fail() {
    filesync()
        .assert()
        .failure()
        .stderr(predicate::str::contains("LOCAL_ROOT"));
}

#[test]
fn test_nonexistent_root_fails() {
    let roots = roots();

    filesync()
        .arg(roots.local.join("missing"))
        .arg(&roots.remote)
        .args(["laptop", "server"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_sync_copies_new_file() {
    let roots = roots();
    fs::write(roots.local.join("notes.txt"), "hello").unwrap();

    filesync()
        .arg(&roots.local)
        .arg(&roots.remote)
        .args(["laptop", "server", "--conflict", "skip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) copied"));

    assert_eq!(fs::read_to_string(roots.remote.join("notes.txt")).unwrap(), "hello");
    let log = fs::read_to_string(roots.local.join(".sync_log")).unwrap();
    assert!(log.starts_with("laptop,"));
}

#[test]
fn test_dry_run_lists_planned_changes() {
    let roots = roots();
    fs::write(roots.remote.join("report.txt"), "q3").unwrap();

    filesync()
        .arg(&roots.local)
        .arg(&roots.remote)
        .args(["laptop", "server", "--conflict", "skip", "--dry-run"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("would copy remote 'report.txt' -> local")
                .and(predicate::str::contains("[dry run] 1 change(s)")),
        );

    assert!(!roots.local.join("report.txt").exists());
    assert!(!roots.local.join(".sync_log").exists());
}

#[test]
fn test_quiet_prints_nothing() {
    let roots = roots();
    fs::write(roots.local.join("a.txt"), "a").unwrap();

    filesync()
        .arg(&roots.local)
        .arg(&roots.remote)
        .args(["laptop", "server", "--conflict", "skip", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_hostname_with_comma_is_rejected() {
    let roots = roots();

    filesync()
        .arg(&roots.local)
        .arg(&roots.remote)
        .args(["lap,top", "server"])
        .assert()
        .failure();
}
