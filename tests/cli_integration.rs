//! Integration tests for the camtrap binary.

#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use camtrap::store::{self, BoundingBox, ColumnOrder, DetectionRecord, DetectorClass};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn camtrap(config_home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("camtrap");
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("RUST_LOG")
        .env_remove("CAMTRAP_CONFIG")
        .env_remove("CAMTRAP_DETECTOR_MODEL")
        .env_remove("CAMTRAP_CLASSIFIER_MODEL")
        .env_remove("CAMTRAP_CLASSIFIER_LABELS")
        .env_remove("CAMTRAP_CLASSIFICATION_THRESHOLD");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    camtrap(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("visualize"))
        .stdout(predicate::str::contains("fetch"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_config_path_and_init() {
    let dir = TempDir::new().unwrap();

    camtrap(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("camtrap"))
        .stdout(predicate::str::contains("config.toml"));

    camtrap(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(dir.path().join("camtrap/config.toml").is_file());

    camtrap(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("classification: 0.8"));
}

#[test]
fn test_config_env_override_is_used() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("site/trap.toml");

    camtrap(dir.path())
        .env("CAMTRAP_CONFIG", &config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trap.toml"));

    camtrap(dir.path())
        .env("CAMTRAP_CONFIG", &config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.is_file());
}

#[test]
fn test_export_missing_store_exits_one() {
    let dir = TempDir::new().unwrap();
    camtrap(dir.path())
        .args(["export", "--no-progress"])
        .arg(dir.path().join("absent.csv"))
        .arg(dir.path().join("out.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("detection log not found"));
}

#[test]
fn test_invalid_column_order_exits_one() {
    let dir = TempDir::new().unwrap();
    camtrap(dir.path())
        .args(["metadata", "images", "log.csv", "Image_Filename,Bogus"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Bogus"));
}

#[test]
fn test_run_names_failing_step() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir_all(&images).unwrap();

    camtrap(dir.path())
        .arg("run")
        .arg(&images)
        .args(["--steps", "sort", "--csv"])
        .arg(dir.path().join("missing.csv"))
        .arg("--sorted")
        .arg(dir.path().join("sorted"))
        .arg("-q")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pipeline failed at step 'sort'"))
        .stderr(predicate::str::contains("caused by: detection log not found"));
}

#[test]
fn test_export_writes_json() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("log.csv");
    let json = dir.path().join("analyzed_data.json");

    let mut record = DetectionRecord::detection(
        "a.jpg",
        0,
        DetectorClass::Animal,
        0.9,
        BoundingBox {
            x_min: 10,
            y_min: 20,
            x_max: 50,
            y_max: 80,
        },
    );
    record.image_width = Some(640);
    record.image_height = Some(480);
    record.predicted_species = Some("Zebra".to_string());
    record.classification_confidence = 0.95;
    store::save(&csv, &[record], &ColumnOrder::master()).unwrap();

    camtrap(dir.path())
        .arg("export")
        .arg(&csv)
        .arg(&json)
        .assert()
        .success();

    let text = fs::read_to_string(&json).unwrap();
    assert!(text.starts_with("[\n    {"));
    assert!(text.contains("\"category\": \"Zebra\""));
}
