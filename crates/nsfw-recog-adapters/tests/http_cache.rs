//! Model cache downloading through the HTTP fetcher.

#![allow(clippy::unwrap_used)]

use std::fs;

use nsfw_recog_adapters::models::{CLASSES, MODEL};
use nsfw_recog_adapters::{http_model_cache, HttpConfig, ModelSources};
use nsfw_recog_core::Error;

fn sources(server: &mockito::Server) -> ModelSources {
    ModelSources {
        model_url: format!("{}/nsfwrecog_v1/nsfwrecog_v1.onnx", server.url()),
        classes_url: format!("{}/nsfwrecog_v1/classes.txt", server.url()),
        ..ModelSources::default()
    }
}

#[test]
fn first_resolve_downloads_then_hits_cache() {
    let mut server = mockito::Server::new();
    let model = server
        .mock("GET", "/nsfwrecog_v1/nsfwrecog_v1.onnx")
        .with_status(200)
        .with_body(vec![7u8; 4096])
        .expect(1)
        .create();
    let classes = server
        .mock("GET", "/nsfwrecog_v1/classes.txt")
        .with_status(200)
        .with_body("FACE_F\nBELLY_EXPOSED\n")
        .expect(1)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join(".NsfwRecog");
    let cache = http_model_cache(cache_dir.clone(), &sources(&server), HttpConfig::default()).unwrap();

    let resolved = cache.resolve(None).unwrap();
    cache.resolve(None).unwrap();

    model.assert();
    classes.assert();
    assert_eq!(resolved.model_path, cache_dir.join(MODEL.filename));
    assert_eq!(fs::metadata(&resolved.model_path).unwrap().len(), 4096);
    assert_eq!(resolved.load_labels().unwrap().len(), 2);
}

#[test]
fn missing_release_asset_caches_nothing() {
    let mut server = mockito::Server::new();
    let _model = server
        .mock("GET", "/nsfwrecog_v1/nsfwrecog_v1.onnx")
        .with_status(404)
        .with_body("Not Found")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let cache = http_model_cache(dir.path().to_path_buf(), &sources(&server), HttpConfig::default())
        .unwrap();

    match cache.resolve(None) {
        Err(Error::Download { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected Download, got {other:?}"),
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn sentinel_served_with_success_status_is_rejected() {
    let mut server = mockito::Server::new();
    let _model = server
        .mock("GET", "/nsfwrecog_v1/nsfwrecog_v1.onnx")
        .with_status(200)
        .with_body("onnx")
        .create();
    let _classes = server
        .mock("GET", "/nsfwrecog_v1/classes.txt")
        .with_status(200)
        .with_body("Not Found")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let cache = http_model_cache(dir.path().to_path_buf(), &sources(&server), HttpConfig::default())
        .unwrap();

    match cache.resolve(None) {
        Err(Error::CorruptDownload { path }) => {
            assert_eq!(path, dir.path().join(CLASSES.filename));
        }
        other => panic!("expected CorruptDownload, got {other:?}"),
    }
}
