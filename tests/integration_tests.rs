//! Integration tests for the lessongate CLI
//!
//! These drive the binary end to end against a temporary progress store.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CATALOG: &str = r#"
[[modules]]
slug = "a"
title = "Module A"
order = 1

[[modules.sections]]
slug = "a1"
order = 1

[[modules.sections]]
slug = "a2"
order = 2

[[modules]]
slug = "b"
order = 2

[[modules.sections]]
slug = "b1"
order = 1
"#;

/// Helper to create a lessongate Command running inside `dir`
fn lessongate(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("lessongate");
    cmd.current_dir(dir.path());
    for var in [
        "LESSONGATE_HOST",
        "LESSONGATE_PORT",
        "LESSONGATE_DB_PATH",
        "LESSONGATE_LANDING_PATH",
        "LESSONGATE_LEARNER_HEADER",
        "LESSONGATE_LOG_LEVEL",
        "LESSONGATE_LOG_JSON",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper to create a project with a seeded catalog and one enrolled learner
fn seeded_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("catalog.toml"), CATALOG).unwrap();
    lessongate(&dir)
        .args(["seed", "catalog.toml"])
        .assert()
        .success();
    lessongate(&dir).args(["enroll", "ada"]).assert().success();
    dir
}

fn record(dir: &TempDir, module: &str, section: &str, status: &str) {
    lessongate(dir)
        .args(["record", "ada", module, section, status])
        .assert()
        .success();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir).arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_database() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Progress database initialized"));
        assert!(dir.path().join(".lessongate/progress.db").exists());
    }

    #[test]
    fn test_db_path_flag() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir)
            .args(["--db-path", "custom/gate.db", "init"])
            .assert()
            .success();
        assert!(dir.path().join("custom/gate.db").exists());
    }

    #[test]
    fn test_db_path_from_environment() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir)
            .env("LESSONGATE_DB_PATH", "env/gate.db")
            .arg("init")
            .assert()
            .success();
        assert!(dir.path().join("env/gate.db").exists());
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No lessongate.toml found"))
            .stdout(predicate::str::contains("landing_path = \"/home\""));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created lessongate.toml"));

        let content = fs::read_to_string(dir.path().join("lessongate.toml")).unwrap();
        assert!(content.contains("[server]"));
        assert!(content.contains("clear_completed_on_regress = false"));

        lessongate(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("lessongate.toml"),
            "[routing]\nlanding_path = \"home\"\n",
        )
        .unwrap();
        lessongate(&dir)
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("landing_path"));
    }

    #[test]
    fn test_routing_config_changes_rendered_paths() {
        let dir = seeded_project();
        fs::write(
            dir.path().join("lessongate.toml"),
            "[routing]\nlanding_path = \"/dashboard\"\nlocation_prefix = \"/courses\"\n",
        )
        .unwrap();
        lessongate(&dir)
            .args(["check", "ada", "a", "a2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("redirect to /courses/a/a1"));
        lessongate(&dir)
            .args(["check", "ada", "missing"])
            .assert()
            .success()
            .stdout(predicate::str::contains("redirect to /dashboard"));
    }
}

// =============================================================================
// Catalog seeding
// =============================================================================

mod catalog {
    use super::*;

    #[test]
    fn test_seed_reports_counts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("catalog.toml"), CATALOG).unwrap();
        lessongate(&dir)
            .args(["seed", "catalog.toml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Seeded 2 modules and 3 sections"));
    }

    #[test]
    fn test_reseed_deactivates_missing_entries() {
        let dir = seeded_project();
        fs::write(
            dir.path().join("smaller.toml"),
            "[[modules]]\nslug = \"a\"\norder = 1\n[[modules.sections]]\nslug = \"a1\"\norder = 1\n",
        )
        .unwrap();
        lessongate(&dir)
            .args(["seed", "smaller.toml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deactivated 1 modules and 1 sections"));

        lessongate(&dir)
            .args(["check", "ada", "b", "b1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ContentNotFound"));
    }

    #[test]
    fn test_seed_rejects_duplicate_slugs() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bad.toml"),
            "[[modules]]\nslug = \"a\"\norder = 1\n[[modules]]\nslug = \"a\"\norder = 2\n",
        )
        .unwrap();
        lessongate(&dir)
            .args(["seed", "bad.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("duplicate module slug"));
    }

    #[test]
    fn test_seed_missing_file() {
        let dir = TempDir::new().unwrap();
        lessongate(&dir)
            .args(["seed", "nope.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read catalog file"));
    }
}

// =============================================================================
// Learner flows
// =============================================================================

mod learner {
    use super::*;

    #[test]
    fn test_enroll_is_idempotent() {
        let dir = seeded_project();
        lessongate(&dir)
            .args(["enroll", "ada"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Enrolled ada (profile 1)"));
    }

    #[test]
    fn test_new_learner_gating() {
        let dir = seeded_project();
        lessongate(&dir)
            .args(["check", "ada", "a", "a1"])
            .assert()
            .success()
            .stdout(predicate::str::diff("allowed\n"));
        lessongate(&dir)
            .args(["check", "ada", "a", "a2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("denied, redirect to /learn/a/a1"));
        lessongate(&dir)
            .args(["check", "ada", "b"])
            .assert()
            .success()
            .stdout(predicate::str::contains("denied, redirect to /learn/a/a1"));
        lessongate(&dir)
            .args(["next", "ada"])
            .assert()
            .success()
            .stdout(predicate::str::diff("/learn/a/a1\n"));
    }

    #[test]
    fn test_completion_unlocks_progressively() {
        let dir = seeded_project();
        record(&dir, "a", "a1", "completed");
        lessongate(&dir)
            .args(["check", "ada", "a", "a2"])
            .assert()
            .success()
            .stdout(predicate::str::diff("allowed\n"));

        record(&dir, "a", "a2", "completed");
        lessongate(&dir)
            .args(["check", "ada", "b"])
            .assert()
            .success()
            .stdout(predicate::str::diff("allowed\n"));
        lessongate(&dir)
            .args(["next", "ada"])
            .assert()
            .success()
            .stdout(predicate::str::diff("/learn/b/b1\n"));

        record(&dir, "b", "b1", "completed");
        lessongate(&dir)
            .args(["next", "ada"])
            .assert()
            .success()
            .stdout(predicate::str::diff("/home\n"));
        lessongate(&dir)
            .args(["check", "ada", "a", "a1"])
            .assert()
            .success()
            .stdout(predicate::str::diff("allowed\n"));
    }

    #[test]
    fn test_record_counts_attempts() {
        let dir = seeded_project();
        for status in ["in_progress", "in_progress", "completed"] {
            record(&dir, "a", "a1", status);
        }
        lessongate(&dir)
            .args(["record", "ada", "a", "a1", "completed"])
            .assert()
            .success()
            .stdout(predicate::str::contains("attempts=4"));
    }

    #[test]
    fn test_record_rejects_invalid_input() {
        let dir = seeded_project();
        lessongate(&dir)
            .args(["record", "ada", "a", "a1", "finished"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid status 'finished'"));
        lessongate(&dir)
            .args(["record", "ada", "a", "a1", "in_progress", "--percentage", "150"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid completion percentage"));
        lessongate(&dir)
            .args(["record", "ada", "a", "zz", "completed"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Content not found: a/zz"));
        lessongate(&dir)
            .args(["record", "grace", "a", "a1", "completed"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No enrollment profile for learner 'grace'"));
    }

    #[test]
    fn test_unenrolled_learner_is_sent_to_landing() {
        let dir = seeded_project();
        lessongate(&dir)
            .args(["check", "grace", "a", "a1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("denied, redirect to /home (ProfileNotFound"));
    }

    #[test]
    fn test_progress_listing() {
        let dir = seeded_project();
        lessongate(&dir)
            .args(["progress", "ada"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No progress recorded for ada"));

        record(&dir, "a", "a2", "skipped");
        record(&dir, "a", "a1", "completed");
        let output = lessongate(&dir)
            .args(["progress", "ada", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let records: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["sectionSlug"], "a1");
        assert_eq!(records[0]["completionPercentage"], 100.0);
        assert_eq!(records[1]["status"], "skipped");
    }
}
