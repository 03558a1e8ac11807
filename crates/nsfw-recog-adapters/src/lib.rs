//! nsfw-recog adapters - external collaborators for nsfw-recog.
//!
//! This crate provides adapters for:
//! - Filesystem image source
//! - HTTP download of model artifacts
//! - ONNX Runtime inference

pub mod fs;
pub mod http;
pub mod models;
pub mod onnx;

pub use fs::FsImageSource;
pub use http::{HttpConfig, HttpFetcher};
pub use models::{default_cache_dir, http_model_cache, ModelSources};
pub use onnx::{OrtEngine, OrtEngineConfig};
