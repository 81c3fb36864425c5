//! E2E CLI tests for consolidation, validation, export and decisions.
//!
//! Each test runs the `fitmerge` binary as a subprocess in an isolated temp
//! directory seeded with hand-written backup files.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the fitmerge binary, rooted in `dir`.
fn fm_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fitmerge"));
    cmd.current_dir(dir);
    // Suppress tracing output that goes to stderr
    cmd.env("FITMERGE_LOG", "error");
    cmd.env_remove("FORMAT");
    // Keep the developer's user config out of the run
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd
}

fn completed(id: &str, day: u32) -> Value {
    json!({
        "id": id,
        "activityId": "act_1",
        "date": format!("2020-01-{day:02}T10:00:00.000Z"),
        "duration": "medium",
        "intensity": "high",
        "notes": ""
    })
}

/// Write a backup dated `day` with a single `Run` activity.
fn write_backup(dir: &Path, name: &str, day: u32, completed: &[Value]) {
    let body = json!({
        "date": format!("2020-01-{day:02}T12:00:00.000Z"),
        "activities": [
            {"id": "act_1", "name": "Run", "otherNames": []}
        ],
        "completedActivities": completed,
        "trainables": [],
        "shortcuts": ["act_1"]
    });
    fs::write(
        dir.join(name),
        serde_json::to_string_pretty(&body).expect("serialize"),
    )
    .expect("write backup");
}

/// Two backups where `cpa_x` vanishes inside the newer backup's window.
fn seed_ambiguous(dir: &Path) {
    write_backup(
        dir,
        "fitness-tracker__2020-01-10.json",
        10,
        &[completed("cpa_a", 3), completed("cpa_x", 7)],
    );
    write_backup(
        dir,
        "fitness-tracker__2020-01-20.json",
        20,
        &[completed("cpa_a", 3), completed("cpa_b", 15)],
    );
}

fn json_stdout(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn completed_ids(path: &Path) -> Vec<String> {
    let backup: Value =
        serde_json::from_str(&fs::read_to_string(path).expect("read output")).expect("json");
    backup["completedActivities"]
        .as_array()
        .expect("completedActivities")
        .iter()
        .map(|c| c["id"].as_str().expect("id").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// consolidate
// ---------------------------------------------------------------------------

#[test]
fn consolidate_prompts_and_remembers_a_deletion() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    let output = fm_cmd(dir.path())
        .args(["consolidate", "--json", "--output-dir", "out"])
        .write_stdin("d\n")
        .output()
        .expect("run consolidate");
    let summary = json_stdout(&output);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("should CompletedActivity 'cpa_x' be [k]ept or [d]eleted?"));
    assert_eq!(summary["stats"]["resolved"], 1);
    assert_eq!(summary["merged"].as_array().expect("merged").len(), 2);

    let written = Path::new(summary["output"].as_str().expect("output path"));
    let written = if written.is_absolute() {
        written.to_path_buf()
    } else {
        dir.path().join(written)
    };
    assert_eq!(completed_ids(&written), ["cpa_a", "cpa_b"]);

    let decisions =
        fs::read_to_string(dir.path().join("decisions__deleted-completed-activities.csv"))
            .expect("decision file");
    assert!(decisions.starts_with("id,reviewed_at,must_be_deleted\n"));
    assert!(decisions.contains("cpa_x,"));

    // A second run reuses the decision and never prompts.
    let output = fm_cmd(dir.path())
        .args(["consolidate", "--json", "--output-dir", "out"])
        .output()
        .expect("rerun consolidate");
    let summary = json_stdout(&output);
    assert_eq!(summary["stats"]["resolved"], 0);
    assert_eq!(summary["stats"]["dropped_by_decision"], 1);
    assert!(!String::from_utf8_lossy(&output.stderr).contains("[k]ept"));
}

#[test]
fn consolidate_keep_answer_retains_the_record() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    let output = fm_cmd(dir.path())
        .args(["consolidate", "--json"])
        .write_stdin("k\n")
        .output()
        .expect("run consolidate");
    let summary = json_stdout(&output);
    assert_eq!(summary["completed_activities"], 3);
}

#[test]
fn consolidate_fails_when_input_closes_before_an_answer() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    fm_cmd(dir.path())
        .args(["consolidate"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2004"));
}

#[test]
fn consolidate_fail_policy_reports_ambiguity() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    fm_cmd(dir.path())
        .args(["consolidate", "--on-ambiguity", "fail"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"))
        .stderr(predicate::str::contains("cpa_x"));
    assert!(
        !dir.path()
            .join("decisions__deleted-completed-activities.csv")
            .exists()
    );
}

#[test]
fn consolidate_keep_policy_does_not_write_decisions() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    let output = fm_cmd(dir.path())
        .args(["consolidate", "--json", "--on-ambiguity", "keep"])
        .output()
        .expect("run consolidate");
    let summary = json_stdout(&output);
    assert_eq!(summary["completed_activities"], 3);
    assert!(
        !dir.path()
            .join("decisions__deleted-completed-activities.csv")
            .exists()
    );
}

#[test]
fn consolidate_empty_directory_fails() {
    let dir = TempDir::new().expect("tempdir");
    fm_cmd(dir.path())
        .args(["consolidate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1004"));
}

#[test]
fn consolidate_reads_project_config() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());
    fs::write(
        dir.path().join("fitmerge.toml"),
        "[consolidate]\non_ambiguity = \"delete\"\noutput_dir = \"merged\"\n",
    )
    .expect("write config");

    let output = fm_cmd(dir.path())
        .args(["consolidate", "--json"])
        .output()
        .expect("run consolidate");
    let summary = json_stdout(&output);
    assert_eq!(summary["completed_activities"], 2);
    assert!(
        summary["output"]
            .as_str()
            .expect("output")
            .starts_with("merged")
    );
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_passes_clean_backups() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    let output = fm_cmd(dir.path())
        .args([
            "validate",
            "--json",
            "fitness-tracker__2020-01-10.json",
            "fitness-tracker__2020-01-20.json",
        ])
        .output()
        .expect("run validate");
    let reports = json_stdout(&output);
    let reports = reports.as_array().expect("array");
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r["ok"] == true));
}

#[test]
fn validate_fails_on_dangling_reference() {
    let dir = TempDir::new().expect("tempdir");
    let mut dangling = completed("cpa_1", 3);
    dangling["activityId"] = json!("act_404");
    write_backup(dir.path(), "broken.json", 10, &[dangling]);

    fm_cmd(dir.path())
        .args(["validate", "broken.json"])
        .env("FORMAT", "text")
        .assert()
        .failure()
        .stdout(predicate::str::contains("broken.json\tcorrupted\t1"))
        .stdout(predicate::str::contains("act_404"));
}

#[test]
fn validate_reports_unreadable_files() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("garbage.json"), "{").expect("write");

    fm_cmd(dir.path())
        .args(["validate", "--json", "garbage.json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"error_code\""));
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

#[test]
fn to_csv_writes_one_file_per_collection() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    let output = fm_cmd(dir.path())
        .args([
            "to-csv",
            "--json",
            "fitness-tracker__2020-01-20.json",
            "--output-dir",
            "csv",
        ])
        .output()
        .expect("run to-csv");
    let summary = json_stdout(&output);
    assert_eq!(summary["written"].as_array().expect("written").len(), 4);

    let completed = fs::read_to_string(
        dir.path()
            .join("csv/fitness-tracker__2020-01-20.json__completed-activities.csv"),
    )
    .expect("completed csv");
    let mut lines = completed.lines();
    assert!(lines.next().expect("header").starts_with("id,"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn to_sqlite_creates_queryable_database() {
    let dir = TempDir::new().expect("tempdir");
    seed_ambiguous(dir.path());

    fm_cmd(dir.path())
        .args(["to-sqlite", "fitness-tracker__2020-01-10.json"])
        .assert()
        .success();

    let db = dir.path().join("fitness-tracker__2020-01-10.sqlite");
    let conn = rusqlite::Connection::open(&db).expect("open sqlite");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM completed_activities", [], |row| {
            row.get(0)
        })
        .expect("count");
    assert_eq!(count, 2);

    // Re-running replaces the file instead of duplicating rows.
    drop(conn);
    fm_cmd(dir.path())
        .args(["to-sqlite", "fitness-tracker__2020-01-10.json"])
        .assert()
        .success();
    let conn = rusqlite::Connection::open(&db).expect("reopen sqlite");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM completed_activities", [], |row| {
            row.get(0)
        })
        .expect("count");
    assert_eq!(count, 2);
}

#[test]
fn to_csv_missing_file_reports_code() {
    let dir = TempDir::new().expect("tempdir");
    fm_cmd(dir.path())
        .args(["to-csv", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

// ---------------------------------------------------------------------------
// decisions / completions
// ---------------------------------------------------------------------------

#[test]
fn decisions_lists_the_decision_file() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("decisions__deleted-completed-activities.csv"),
        "id,reviewed_at,must_be_deleted\n\
         cpa_2,2022-07-20T00:00:00.000Z,false\n\
         cpa_1,2022-07-19T00:00:00.000Z,true\n",
    )
    .expect("write decisions");

    let output = fm_cmd(dir.path())
        .args(["decisions", "--json"])
        .output()
        .expect("run decisions");
    let decisions = json_stdout(&output);
    let decisions = decisions.as_array().expect("array");
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0]["id"], "cpa_1");
    assert_eq!(decisions[0]["must_be_deleted"], true);

    let output = fm_cmd(dir.path())
        .args(["decisions", "--json", "--deleted"])
        .output()
        .expect("run decisions --deleted");
    assert_eq!(json_stdout(&output).as_array().expect("array").len(), 1);
}

#[test]
fn decisions_without_a_file_is_empty() {
    let dir = TempDir::new().expect("tempdir");
    let output = fm_cmd(dir.path())
        .args(["decisions", "--json"])
        .output()
        .expect("run decisions");
    assert_eq!(json_stdout(&output), json!([]));
}

#[test]
fn completions_bash_mentions_subcommands() {
    let dir = TempDir::new().expect("tempdir");
    fm_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consolidate"))
        .stdout(predicate::str::contains("to-sqlite"));
}
