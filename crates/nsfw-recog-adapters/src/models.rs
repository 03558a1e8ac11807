//! Published model artifacts and cache wiring.

use std::path::PathBuf;

use nsfw_recog_core::cache::{Artifact, ModelCache, CLASSES_FILENAME};

use crate::http::{HttpConfig, HttpFetcher};

/// A published release file and the name it is cached under.
#[derive(Debug, Clone)]
pub struct ReleaseAsset {
    /// Download URL (GitHub releases).
    pub url: &'static str,
    /// Filename in the cache directory.
    pub filename: &'static str,
}

/// The detection checkpoint.
pub const MODEL: ReleaseAsset = ReleaseAsset {
    url: "https://github.com/padmalcom/nsfwrecog/releases/download/nsfwrecog_v1/nsfwrecog_v1.onnx",
    filename: "nsfwrecog_v1.onnx",
};

/// Class names for the checkpoint, one per line.
pub const CLASSES: ReleaseAsset = ReleaseAsset {
    url: "https://github.com/padmalcom/nsfwrecog/releases/download/nsfwrecog_v1/classes.txt",
    filename: CLASSES_FILENAME,
};

/// Returns the default cache directory, `~/.NsfwRecog`.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".NsfwRecog")
}

/// Where to download the artifacts from, and what they must hash to.
#[derive(Debug, Clone)]
pub struct ModelSources {
    pub model_url: String,
    pub classes_url: String,
    pub model_sha256: Option<String>,
    pub classes_sha256: Option<String>,
}

impl Default for ModelSources {
    fn default() -> Self {
        Self {
            model_url: MODEL.url.to_owned(),
            classes_url: CLASSES.url.to_owned(),
            model_sha256: None,
            classes_sha256: None,
        }
    }
}

impl ModelSources {
    /// Builds the cache artifacts for these sources.
    #[must_use]
    pub fn artifacts(&self) -> (Artifact, Artifact) {
        let mut model = Artifact::new(&self.model_url, MODEL.filename);
        model.sha256.clone_from(&self.model_sha256);

        let mut classes = Artifact::new(&self.classes_url, CLASSES.filename);
        classes.sha256.clone_from(&self.classes_sha256);

        (model, classes)
    }
}

/// Builds a model cache that downloads over HTTP.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn http_model_cache(
    dir: PathBuf,
    sources: &ModelSources,
    http: HttpConfig,
) -> anyhow::Result<ModelCache> {
    let fetcher = HttpFetcher::new(http)?;
    let (model, classes) = sources.artifacts();
    Ok(ModelCache::new(dir, model, classes, Box::new(fetcher)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_dir() {
        assert!(default_cache_dir().ends_with(".NsfwRecog"));
    }

    #[test]
    fn test_default_sources_point_at_release() {
        let (model, classes) = ModelSources::default().artifacts();
        assert_eq!(model.url, MODEL.url);
        assert_eq!(model.filename, "nsfwrecog_v1.onnx");
        assert_eq!(classes.filename, "classes.txt");
        assert!(model.sha256.is_none());
    }

    #[test]
    fn test_sources_carry_checksums() {
        let sources = ModelSources {
            model_sha256: Some("ab".repeat(32)),
            ..ModelSources::default()
        };
        let (model, classes) = sources.artifacts();
        assert_eq!(model.sha256.as_deref(), Some("ab".repeat(32).as_str()));
        assert!(classes.sha256.is_none());
    }

    #[test]
    fn test_http_model_cache_lists_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = http_model_cache(
            dir.path().to_path_buf(),
            &ModelSources::default(),
            HttpConfig::default(),
        )
        .unwrap();

        let status = cache.status();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|(_, installed)| !installed));
        assert_eq!(status[0].0.local_path, dir.path().join(MODEL.filename));
    }
}
