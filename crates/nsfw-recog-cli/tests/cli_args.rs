//! Argument parsing and error reporting that never reaches the inference runtime.

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use nsfw_recog_test_support::ModelFixture;
use predicates::prelude::*;

/// A command isolated from the user's config, home and token.
fn nsfw_recog(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nsfw-recog").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("NSFW_RECOG_TOKEN");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = tempfile::tempdir().unwrap();
    nsfw_recog(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("blur"))
        .stdout(predicate::str::contains("annotate"))
        .stdout(predicate::str::contains("models"));
}

#[test]
fn test_subcommand_is_required() {
    let temp = tempfile::tempdir().unwrap();
    nsfw_recog(temp.path()).assert().failure().code(2);
}

#[test]
fn test_detect_requires_paths() {
    let temp = tempfile::tempdir().unwrap();
    nsfw_recog(temp.path())
        .arg("detect")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_confidence_out_of_range_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    nsfw_recog(temp.path())
        .args(["detect", "--confidence", "2.0", "photo.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 is not in 0.0..=1.0"));
}

#[test]
fn test_confidence_not_a_number_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    nsfw_recog(temp.path())
        .args(["blur", "--confidence", "high", "in.jpg", "out.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'high' is not a valid number"));
}

#[test]
fn test_missing_model_override_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("nowhere/model.onnx");

    nsfw_recog(temp.path())
        .arg("detect")
        .arg("--model")
        .arg(&missing)
        .arg("photo.jpg")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains("model.onnx"));
}

#[test]
fn test_model_override_without_classes_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let model = temp.path().join("model.onnx");
    fs::write(&model, b"onnx").unwrap();

    nsfw_recog(temp.path())
        .args(["annotate", "in.jpg", "out.jpg", "--model"])
        .arg(&model)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("classes.txt"));
}

#[test]
fn test_sentinel_model_is_reported_as_corrupt() {
    let temp = tempfile::tempdir().unwrap();
    let fixture = ModelFixture::write_with(temp.path(), b"Not Found", "FACE_F\n").unwrap();

    nsfw_recog(temp.path())
        .args(["blur", "in.jpg", "out.jpg", "--model"])
        .arg(&fixture.model_path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not downloaded correctly"));

    assert!(!temp.path().join("out.jpg").exists());
}

#[test]
fn test_empty_classes_file_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let fixture = ModelFixture::write_with(temp.path(), b"onnx", "").unwrap();

    nsfw_recog(temp.path())
        .args(["detect", "photo.jpg", "--model"])
        .arg(&fixture.model_path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is empty"));
}

#[test]
fn test_models_path_prints_override() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("cache");

    nsfw_recog(temp.path())
        .args(["models", "path", "--models-dir"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(dir.to_string_lossy().as_ref()));
}

#[test]
fn test_models_path_defaults_to_home() {
    let temp = tempfile::tempdir().unwrap();

    nsfw_recog(temp.path())
        .args(["models", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".NsfwRecog"));
}

#[test]
fn test_models_list_empty_cache() {
    let temp = tempfile::tempdir().unwrap();

    nsfw_recog(temp.path())
        .args(["models", "list", "--models-dir"])
        .arg(temp.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ nsfwrecog_v1.onnx"))
        .stdout(predicate::str::contains("0/2 files installed"));
}

#[test]
fn test_models_list_counts_cached_files() {
    let temp = tempfile::tempdir().unwrap();
    let cache = temp.path().join("cache");
    fs::create_dir(&cache).unwrap();
    fs::write(cache.join("classes.txt"), "FACE_F\n").unwrap();

    nsfw_recog(temp.path())
        .args(["models", "list", "--models-dir"])
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ classes.txt"))
        .stdout(predicate::str::contains("1/2 files installed"));
}
