//! Integration tests for the turtle binary.
//!
//! These tests verify end-to-end behavior including:
//! - Starting, editing and finishing a workout across invocations
//! - Confirmation of destructive commands
//! - History, last-session lookup and CSV export
//! - Catalog and template listing

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory with a fast-ticking config
fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[timers]\ntick_millis = 10\ndefault_rest_seconds = 2\n",
    )
    .expect("Failed to write config");
    temp_dir
}

/// Helper to get the CLI binary, pointed at the test directory
fn turtle(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("turtle"));
    cmd.arg("--data-dir")
        .arg(dir.join("data"))
        .arg("--config")
        .arg(dir.join("config.toml"));
    cmd
}

fn active_workout(dir: &Path) -> serde_json::Value {
    let content = fs::read_to_string(dir.join("data/active_workout.json"))
        .expect("Failed to read active workout");
    serde_json::from_str(&content).expect("Invalid active workout JSON")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("turtle"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Iron Turtle workout tracker"));
}

#[test]
fn test_status_without_workout() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No active workout."));
}

#[test]
fn test_start_empty_uses_default_name() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .arg("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("Started workout 'New Workout'"));

    let workout = active_workout(temp_dir.path());
    assert_eq!(workout["name"], "New Workout");
    assert!(workout["exercises"].as_array().unwrap().is_empty());
}

#[test]
fn test_start_from_template_prefills_sets() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .args(["start", "--template", "template-ppl-legs-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exercises ready"));

    let workout = active_workout(temp_dir.path());
    assert_eq!(workout["template_id"], "template-ppl-legs-1");
    let exercises = workout["exercises"].as_array().unwrap();
    assert!(!exercises.is_empty());
    assert_eq!(exercises[0]["order"], 0);
    assert!(exercises[0]["sets"].as_array().unwrap().len() >= 1);
}

#[test]
fn test_start_unknown_template_fails() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .args(["start", "--template", "template-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("template-missing"));
}

#[test]
fn test_start_replacing_workout_is_cancelled_without_confirmation() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .args(["start", "--name", "First"])
        .assert()
        .success();

    turtle(temp_dir.path())
        .args(["start", "--name", "Second"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));

    assert_eq!(active_workout(temp_dir.path())["name"], "First");

    turtle(temp_dir.path())
        .args(["start", "--name", "Second", "--yes"])
        .assert()
        .success();

    assert_eq!(active_workout(temp_dir.path())["name"], "Second");
}

#[test]
fn test_add_exercise_and_complete_set() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).args(["start", "--name", "Push"]).assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-db-bench-press", "--sets", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("as exercise 1"));

    turtle(dir)
        .args(["complete-set", "1", "1", "--weight", "60", "--reps", "8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed set 1"))
        .stdout(predicate::str::contains("Progress: 1/2 sets"));

    let workout = active_workout(dir);
    let set = &workout["exercises"][0]["sets"][0];
    assert_eq!(set["is_completed"], true);
    assert_eq!(set["weight"], 60.0);
    assert_eq!(set["reps"], 8);
    assert!(set["completed_at"].is_string());

    turtle(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Push"))
        .stdout(predicate::str::contains("(1/2)"));
}

#[test]
fn test_isometric_exercise_records_duration() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-llpt-plank", "--sets", "1"])
        .assert()
        .success();
    turtle(dir)
        .args(["update-set", "1", "1", "--reps", "45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("45 secs"));

    let set = &active_workout(dir)["exercises"][0]["sets"][0];
    assert_eq!(set["duration"], 45);
    assert!(set.get("reps").is_none());
}

#[test]
fn test_negative_weight_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-leg-press", "--sets", "1"])
        .assert()
        .success();
    turtle(dir)
        .args(["update-set", "1", "1", "--weight=-5"])
        .assert()
        .failure();

    assert_eq!(active_workout(dir)["exercises"][0]["sets"][0]["weight"], 0.0);
}

#[test]
fn test_add_set_copies_last_set() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-leg-press", "--sets", "1"])
        .assert()
        .success();
    turtle(dir)
        .args(["update-set", "1", "1", "--weight", "140", "--reps", "10"])
        .assert()
        .success();
    turtle(dir)
        .args(["add-set", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("140 x 10"));

    let sets = active_workout(dir)["exercises"][0]["sets"].clone();
    assert_eq!(sets.as_array().unwrap().len(), 2);
    assert_eq!(sets[1]["is_completed"], false);
}

#[test]
fn test_remove_set_requires_confirmation() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-leg-press", "--sets", "2"])
        .assert()
        .success();

    turtle(dir)
        .args(["remove-set", "1", "2"])
        .write_stdin("no\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));
    assert_eq!(
        active_workout(dir)["exercises"][0]["sets"].as_array().unwrap().len(),
        2
    );

    turtle(dir)
        .args(["remove-set", "1", "2"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Set removed"));
    assert_eq!(
        active_workout(dir)["exercises"][0]["sets"].as_array().unwrap().len(),
        1
    );
}

#[test]
fn test_reorder_exercises() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir).args(["add-exercise", "preset-leg-press"]).assert().success();
    turtle(dir).args(["add-exercise", "preset-llpt-plank"]).assert().success();

    turtle(dir).args(["reorder", "2", "1"]).assert().success();

    let workout = active_workout(dir);
    assert_eq!(workout["exercises"][0]["exercise"]["id"], "preset-llpt-plank");
    assert_eq!(workout["exercises"][0]["order"], 0);
    assert_eq!(workout["exercises"][1]["exercise"]["id"], "preset-leg-press");
    assert_eq!(workout["exercises"][1]["order"], 1);
}

#[test]
fn test_open_exercise_persists_between_commands() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir)
        .args(["start", "--template", "template-core-finisher"])
        .assert()
        .success();
    turtle(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("> 1."));

    turtle(dir)
        .args(["open", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Opened"));
    turtle(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("> 2."))
        .stdout(predicate::str::contains("> 1.").not());

    // Closing sticks instead of reopening the first exercise
    turtle(dir)
        .args(["open", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Closed"));
    turtle(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("> ").not());
}

#[test]
fn test_completing_open_exercise_advances_across_commands() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir)
        .args(["start", "--template", "template-core-finisher"])
        .assert()
        .success();
    for set in ["1", "2", "3"] {
        turtle(dir).args(["complete-set", "1", set]).assert().success();
    }

    turtle(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("> 2."));

    // Reopening a finished exercise does not advance again
    turtle(dir).args(["open", "1"]).assert().success();
    turtle(dir).args(["notes", "light day"]).assert().success();
    turtle(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("> 1."));
}

#[test]
fn test_finish_without_completed_sets_needs_force() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir).args(["add-exercise", "preset-leg-press"]).assert().success();

    turtle(dir)
        .arg("finish")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No sets completed"));
    assert!(dir.join("data/active_workout.json").exists());

    turtle(dir).args(["finish", "--force"]).assert().success();
    assert!(!dir.join("data/active_workout.json").exists());
}

#[test]
fn test_finish_records_history_and_last_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).args(["start", "--name", "Legs"]).assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-leg-press", "--sets", "3"])
        .assert()
        .success();
    turtle(dir)
        .args(["complete-set", "1", "1", "--weight", "150", "--reps", "8"])
        .assert()
        .success();
    turtle(dir)
        .args(["complete-set", "1", "2", "--weight", "150", "--reps", "7"])
        .assert()
        .success();

    turtle(dir)
        .arg("finish")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout 'Legs' saved"))
        .stdout(predicate::str::contains("1 exercises, 2 sets"));

    // The incomplete third set is not kept
    let history = fs::read_to_string(dir.join("data/history.jsonl")).unwrap();
    assert_eq!(history.lines().count(), 1);
    let finished: serde_json::Value = serde_json::from_str(history.lines().next().unwrap()).unwrap();
    assert!(finished["finished_at"].is_string());
    assert_eq!(finished["exercises"][0]["sets"].as_array().unwrap().len(), 2);

    turtle(dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("Legs"));

    turtle(dir)
        .args(["last", "preset-leg-press"])
        .assert()
        .success()
        .stdout(predicate::str::contains("150 x 8"))
        .stdout(predicate::str::contains("150 x 7"));

    // A new workout prefills from the last session
    turtle(dir).arg("start").assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-leg-press", "--sets", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Prefilled from"));
    let workout = active_workout(dir);
    assert_eq!(workout["exercises"][0]["sets"][0]["weight"], 150.0);
    assert_eq!(workout["exercises"][0]["sets"][0]["is_completed"], false);
}

#[test]
fn test_discard_with_yes() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir)
        .args(["discard", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout discarded"));

    assert!(!dir.join("data/active_workout.json").exists());
    assert!(!dir.join("data/history.jsonl").exists());
}

#[test]
fn test_commands_need_active_workout() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .args(["add-exercise", "preset-leg-press"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NoActiveWorkout"));
}

#[test]
fn test_notes_saved_and_cleared() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir).arg("start").assert().success();
    turtle(dir).args(["notes", "felt", "strong"]).assert().success();
    assert_eq!(active_workout(dir)["notes"], "felt strong");

    turtle(dir).arg("notes").assert().success();
    assert!(active_workout(dir).get("notes").map_or(true, |n| n.is_null()));
}

#[test]
fn test_rest_countdown_runs_to_zero() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .args(["rest", "--seconds", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0:00"))
        .stdout(predicate::str::contains("Rest over"));
}

#[test]
fn test_exercise_listing_filters() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .args(["exercises", "--pattern", "core"])
        .assert()
        .success()
        .stdout(predicate::str::contains("preset-llpt-plank"))
        .stdout(predicate::str::contains("preset-leg-press").not());

    turtle(temp_dir.path())
        .args(["exercises", "--search", "nothing-matches-this"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No exercises match."));
}

#[test]
fn test_create_custom_exercise_persists() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir)
        .args(["create-exercise", "Sled Push", "--muscle", "legs", "--equipment", "other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created exercise Sled Push (custom-"));

    turtle(dir)
        .args(["exercises", "--search", "sled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sled Push"));
}

#[test]
fn test_create_exercise_requires_equipment() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    turtle(dir)
        .args(["create-exercise", "Sled Push", "--muscle", "legs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one equipment type is required"));

    assert!(!dir.join("data/custom_exercises.json").exists());
    turtle(dir)
        .args(["exercises", "--search", "sled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No exercises match."));
}

#[test]
fn test_template_listing_by_tag() {
    let temp_dir = setup_test_dir();

    turtle(temp_dir.path())
        .args(["templates", "--tag", "core"])
        .assert()
        .success()
        .stdout(predicate::str::contains("template-core-finisher"))
        .stdout(predicate::str::contains("template-ppl-push-1").not());
}

#[test]
fn test_export_creates_csv() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let csv_path = dir.join("out/workouts.csv");

    turtle(dir).arg("start").assert().success();
    turtle(dir)
        .args(["add-exercise", "preset-leg-press", "--sets", "1"])
        .assert()
        .success();
    turtle(dir)
        .args(["complete-set", "1", "1", "--weight", "100", "--reps", "12"])
        .assert()
        .success();
    turtle(dir).arg("finish").assert().success();

    turtle(dir)
        .arg("export")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 sets"));

    let content = fs::read_to_string(&csv_path).unwrap();
    assert!(content.starts_with("workout_id,"));
    assert!(content.contains("preset-leg-press"));
    assert_eq!(content.lines().count(), 2);

    // Exporting again rewrites the file instead of appending to it
    turtle(dir).arg("export").arg(&csv_path).assert().success();
    let again = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(again.lines().count(), 2);
}
