//! End-to-end exercises of the `sunwell-memory` binary against a
//! scratch storage root (spec §6 external interfaces).

use assert_cmd::Command;
use predicates::prelude::*;

fn cli(project_root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("sunwell-memory").unwrap();
    cmd.env("HOME", project_root);
    cmd.arg("--project").arg("e2e-test");
    cmd
}

#[test]
fn journal_append_then_tail_roundtrips() {
    let dir = tempfile::tempdir().unwrap();

    cli(dir.path())
        .args([
            "journal",
            "append",
            "--fact",
            "Project uses Python",
            "--category",
            "project",
            "--confidence",
            "0.8",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("appended at seq 1"));

    cli(dir.path())
        .args(["journal", "tail", "--from", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project uses Python"));
}

#[test]
fn cache_sync_then_search_finds_the_appended_fact() {
    let dir = tempfile::tempdir().unwrap();

    cli(dir.path())
        .args([
            "journal",
            "append",
            "--fact",
            "Retry with exponential back-off",
            "--category",
            "pattern",
            "--confidence",
            "0.7",
        ])
        .assert()
        .success();

    cli(dir.path())
        .args(["cache", "sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("applied 1 journal entries"));

    cli(dir.path())
        .args(["cache", "search", "exponential"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Retry with exponential back-off"));
}

#[test]
fn decision_record_then_contradiction_check() {
    let dir = tempfile::tempdir().unwrap();

    cli(dir.path())
        .args([
            "decision",
            "record",
            "--category",
            "database",
            "--question",
            "How should we persist data?",
            "--choice",
            "SQLite",
            "--rationale",
            "simple and sufficient",
            "--confidence",
            "0.9",
            "--session-id",
            "s1",
            "--rejected",
            "Redis caching|too much complexity for our scale",
        ])
        .assert()
        .success();

    cli(dir.path())
        .args(["decision", "check-contradiction", "Let's add Redis caching", "database"])
        .assert()
        .success()
        .stdout(predicate::str::contains("contradicts"));

    cli(dir.path())
        .args(["decision", "check-contradiction", "Keep using SQLite", "database"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no contradiction"));
}

#[test]
fn lineage_create_then_show_reports_the_tracked_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let content_path = dir.path().join("content.txt");
    std::fs::write(&content_path, b"class Auth: pass").unwrap();

    cli(dir.path())
        .args([
            "lineage",
            "create",
            "src/auth.py",
            "--content-file",
            content_path.to_str().unwrap(),
            "--reason",
            "Auth module",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/auth.py"));

    cli(dir.path())
        .args(["lineage", "show", "src/auth.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/auth.py"));
}
