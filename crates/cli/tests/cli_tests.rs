//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};

fn bfe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bfe"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = bfe(&["--help"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Body Fat Estimator"), "Should show app name");
    for command in ["predict", "chat", "health", "bmi", "train", "reload"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = bfe(&["--version"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("bfe"), "Should show binary name");
}

#[test]
fn test_predict_help_lists_measurements() {
    let output = bfe(&["predict", "--help"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success());
    for flag in ["--abdomen", "--height-cm", "--height-in", "--local"] {
        assert!(stdout.contains(flag), "Should show {} flag", flag);
    }
}

#[test]
fn test_predict_rejects_both_heights() {
    let output = bfe(&[
        "predict",
        "--local",
        "--height-cm",
        "175",
        "--height-in",
        "68.9",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_bmi_table() {
    let output = bfe(&["bmi", "--weight", "70", "--height-cm", "175"]);
    let stdout = stdout_of(&output);

    assert!(output.status.success());
    assert!(stdout.contains("22.9"), "got: {}", stdout);
    assert!(stdout.contains("normal weight"), "got: {}", stdout);
}

#[test]
fn test_bmi_json() {
    let output = bfe(&[
        "--format", "json", "bmi", "--weight", "95", "--height-cm", "175",
    ]);
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["bmi"], 31.0);
    assert_eq!(body["category"], "obese");
}

#[test]
fn test_bmi_rejects_zero_height() {
    let output = bfe(&["bmi", "--weight", "70", "--height-cm", "0"]);
    assert!(!output.status.success());
}

#[test]
fn test_train_rejects_zero_trees() {
    let dir = tempfile::tempdir().unwrap();
    let dir_arg = dir.path().to_str().unwrap();
    let output = bfe(&["train", "--artifact-dir", dir_arg, "--trees", "0"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--trees"));
}

#[test]
fn test_predict_local_without_artifacts_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = bfe(&[
        "predict",
        "--local",
        "--artifact-dir",
        dir.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bfe train"));
}

fn write_dataset(dir: &Path) -> String {
    let path = dir.join("bodyfat.csv");
    std::fs::write(&path, estimator_lib::testing::synthetic_csv(60)).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_train_then_predict_local() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let artifact_dir = dir.path().to_str().unwrap();

    let output = bfe(&[
        "--format",
        "json",
        "train",
        "--dataset",
        &dataset,
        "--artifact-dir",
        artifact_dir,
        "--trees",
        "10",
    ]);
    assert!(
        output.status.success(),
        "train failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["rows_used"], 60);
    assert!(summary["features"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "Abdomen"));

    for file in [
        "bodyfat_model.json",
        "scaler.json",
        "features.txt",
        "manifest.json",
    ] {
        assert!(dir.path().join(file).exists(), "{} should be written", file);
    }

    let output = bfe(&[
        "--format",
        "json",
        "predict",
        "--local",
        "--artifact-dir",
        artifact_dir,
        "--weight",
        "70",
        "--height-cm",
        "175",
        "--abdomen",
        "85",
    ]);
    assert!(
        output.status.success(),
        "predict failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let prediction = result["prediction"].as_f64().unwrap();
    assert!((5.0..=50.0).contains(&prediction));
    assert_eq!(result["bmi"], 22.9);
    assert_eq!(result["bmi_category"], "normal weight");
}
