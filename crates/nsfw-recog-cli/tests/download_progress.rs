//! Commands that run the detector report model downloads on stderr.

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn nsfw_recog(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nsfw-recog").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("NSFW_RECOG_TOKEN");
    cmd
}

/// Serves a checkpoint and a broken class list, so the run stops at
/// validation before any inference session is built.
fn broken_release(server: &mut mockito::Server, dir: &Path) -> [mockito::Mock; 2] {
    let model = server
        .mock("GET", "/v1/model.onnx")
        .with_status(200)
        .with_body(vec![1u8; 4096])
        .create();
    let classes = server
        .mock("GET", "/v1/classes.txt")
        .with_status(200)
        .with_body("Not Found")
        .create();

    fs::write(
        dir.join(".nsfw-recog.toml"),
        format!(
            "[models]\nmodel_url = '{0}/v1/model.onnx'\nclasses_url = '{0}/v1/classes.txt'\n",
            server.url()
        ),
    )
    .unwrap();
    [model, classes]
}

#[test]
fn test_detect_reports_download_on_stderr() {
    let mut server = mockito::Server::new();
    let temp = tempfile::tempdir().unwrap();
    let _mocks = broken_release(&mut server, temp.path());

    nsfw_recog(temp.path())
        .args(["detect", "photo.jpg", "--models-dir"])
        .arg(temp.path().join("cache"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Downloading model.onnx"))
        .stderr(predicate::str::contains("Downloading classes.txt"))
        .stderr(predicate::str::contains("not downloaded correctly"));
}

#[test]
fn test_blur_reports_download_on_stderr() {
    let mut server = mockito::Server::new();
    let temp = tempfile::tempdir().unwrap();
    let _mocks = broken_release(&mut server, temp.path());

    nsfw_recog(temp.path())
        .args(["blur", "in.jpg", "out.jpg", "--models-dir"])
        .arg(temp.path().join("cache"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Downloading model.onnx"));
}

#[test]
fn test_quiet_hides_download_progress() {
    let mut server = mockito::Server::new();
    let temp = tempfile::tempdir().unwrap();
    let _mocks = broken_release(&mut server, temp.path());

    nsfw_recog(temp.path())
        .args(["annotate", "in.jpg", "out.jpg", "-q", "--models-dir"])
        .arg(temp.path().join("cache"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Downloading").not())
        .stderr(predicate::str::contains("not downloaded correctly"));
}

#[test]
fn test_cached_model_is_not_announced() {
    let temp = tempfile::tempdir().unwrap();
    let cache = temp.path().join("cache");
    fs::create_dir(&cache).unwrap();
    fs::write(cache.join("nsfwrecog_v1.onnx"), "Not Found").unwrap();
    fs::write(cache.join("classes.txt"), "FACE_F\n").unwrap();

    nsfw_recog(temp.path())
        .args(["detect", "photo.jpg", "--models-dir"])
        .arg(&cache)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Downloading").not());
}
