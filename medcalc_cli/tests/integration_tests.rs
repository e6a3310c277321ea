//! Integration tests for the medcalc binary.
//!
//! These tests verify end-to-end behavior including:
//! - Listing, searching and describing calculators
//! - One-shot evaluation and input error reporting
//! - Profile sharing between calculators in an interactive session
//! - Configuration loading

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create an empty config so the user's own config is never read
fn setup_config() -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "").expect("Failed to write config");
    (temp_dir, path)
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("medcalc"))
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Medical calculators with a shared patient profile",
        ));
}

#[test]
fn test_list_by_default() {
    let (_dir, config) = setup_config();
    cli()
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("bmi"))
        .stdout(predicate::str::contains("wells_pe"));
}

#[test]
fn test_list_search_and_category() {
    let (_dir, config) = setup_config();
    cli()
        .args(["list", "--search", "sepsis", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("qsofa"))
        .stdout(predicate::str::contains("bmi").not());

    cli()
        .args(["list", "--category", "renal", "--json", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"egfr\""))
        .stdout(predicate::str::contains("\"gcs\"").not());
}

#[test]
fn test_unknown_category_fails() {
    let (_dir, config) = setup_config();
    cli()
        .args(["list", "--category", "dermatology", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category"));
}

#[test]
fn test_show_marks_shared_fields() {
    let (_dir, config) = setup_config();
    cli()
        .args(["show", "anion_gap", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("*sodium"))
        .stdout(predicate::str::contains(" includeK"))
        .stdout(predicate::str::contains("(optional)"));
}

#[test]
fn test_calc_one_shot() {
    let (_dir, config) = setup_config();
    cli()
        .args(["calc", "bmi", "--set", "weight=70", "--set", "height=175", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("22.9 kg/m²"))
        .stdout(predicate::str::contains("Normal weight"));
}

#[test]
fn test_calc_json_output() {
    let (_dir, config) = setup_config();
    let output = cli()
        .args(["calc", "map", "--set", "sbp=120", "--set", "dbp=75", "--json", "--config"])
        .arg(&config)
        .output()
        .expect("Failed to run medcalc");
    assert!(output.status.success());

    let body: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output is not JSON");
    assert_eq!(body["calculator"], "map");
    assert_eq!(body["values"]["sbp"], "120");
    assert_eq!(body["result"]["value"], 90.0);
}

#[test]
fn test_calc_reports_invalid_input() {
    let (_dir, config) = setup_config();
    cli()
        .args(["calc", "bmi", "--set", "weight=heavy", "--set", "height=175", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("enter a valid weight"));
}

#[test]
fn test_calc_rejects_unknown_field() {
    let (_dir, config) = setup_config();
    cli()
        .args(["calc", "bmi", "--set", "waist=90", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no field 'waist'"));
}

#[test]
fn test_calc_unknown_calculator() {
    let (_dir, config) = setup_config();
    cli()
        .args(["calc", "apgar", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown calculator: apgar"));
}

#[test]
fn test_session_shares_weight_between_calculators() {
    let (_dir, config) = setup_config();
    cli()
        .args(["session", "--open", "bmi", "--open", "maintenance_fluids", "--config"])
        .arg(&config)
        .write_stdin("set 1 weight 70\nsync 2 weight\nprofile\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[2] maintenance_fluids - suggestion available: weight=70",
        ))
        .stdout(predicate::str::contains("= 110 mL/h"))
        .stdout(predicate::str::contains("weight           70"));
}

#[test]
fn test_session_reset_keeps_profile() {
    let (_dir, config) = setup_config();
    cli()
        .args(["session", "--open", "bmi", "--config"])
        .arg(&config)
        .write_stdin("set 1 weight 70\nreset 1\nprofile\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[1] Body mass index (bmi) - suggestion available",
        ))
        .stdout(predicate::str::contains("<- profile has 70"))
        .stdout(predicate::str::contains("weight           70"));
}

#[test]
fn test_session_clear_profile_removes_suggestions() {
    let (_dir, config) = setup_config();
    cli()
        .args(["session", "--open", "shock_index", "--open", "map", "--config"])
        .arg(&config)
        .write_stdin("set 1 sbp 95\nclear\nprofile\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[2] map - suggestion available: sbp=95"))
        .stdout(predicate::str::contains("[2] map - blank"))
        .stdout(predicate::str::contains("Patient profile is empty."));
}

#[test]
fn test_session_reports_bad_commands_and_continues() {
    let (_dir, config) = setup_config();
    cli()
        .args(["session", "--config"])
        .arg(&config)
        .write_stdin("frobnicate\nclose 3\nopen gcs\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("error: unknown command 'frobnicate'"))
        .stdout(predicate::str::contains("error: Unknown calculator instance: 3"))
        .stdout(predicate::str::contains("= 15  Mild brain injury"));
}

#[test]
fn test_config_opens_calculators() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        "[session]\nopen = [\"egfr\"]\n\n[display]\ndecimals = 2\n",
    )
    .expect("Failed to write config");

    cli()
        .args(["session", "--config"])
        .arg(&path)
        .write_stdin("quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("eGFR (CKD-EPI 2021) (egfr)"));
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[session]\nopen = [\"nope\"]\n").expect("Failed to write config");

    cli()
        .args(["list", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_session_logs_go_to_stderr() {
    let (_dir, config) = setup_config();
    cli()
        .args(["session", "--config"])
        .arg(&config)
        .env("RUST_LOG", "debug")
        .write_stdin("frobnicate\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("error: unknown command 'frobnicate'"))
        .stdout(predicate::str::contains("Session command failed").not())
        .stderr(predicate::str::contains("Session command failed"));
}
