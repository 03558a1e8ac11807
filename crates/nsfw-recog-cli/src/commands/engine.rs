//! Model options shared by the commands that run the detector.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use nsfw_recog_adapters::{default_cache_dir, http_model_cache, OrtEngine, OrtEngineConfig};
use nsfw_recog_core::{DetectionAdapter, ModelCache, DEFAULT_CONFIDENCE};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::output::DownloadProgress;

/// Parses a value in `0.0..=1.0`.
pub fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Where the model cache lives and how to reach the download host.
#[derive(Args, Clone, Debug, Default)]
pub struct CacheArgs {
    /// Model cache directory [default: ~/.NsfwRecog]
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Bearer token sent with model downloads
    #[arg(long, env = "NSFW_RECOG_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl CacheArgs {
    /// Fills in the cache directory from config when not given on the command line.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if self.models_dir.is_none() {
            self.models_dir.clone_from(&config.models.dir);
        }
        self
    }

    /// The effective cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(default_cache_dir)
    }

    /// Builds the model cache from these options and the config's sources.
    pub fn model_cache(&self, config: &AppConfig) -> Result<ModelCache> {
        let dir = self.cache_dir();
        debug!("Using models directory: {}", dir.display());
        http_model_cache(
            dir,
            &config.models.sources(),
            config.models.http(self.token.clone()),
        )
    }
}

/// Model selection and detection threshold.
#[derive(Args, Clone, Debug, Default)]
pub struct EngineArgs {
    /// Use this checkpoint instead of the cache; classes.txt must sit next to it
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Minimum confidence for a region to be reported (0.0-1.0) [default: 0.25]
    #[arg(short, long, value_parser = parse_threshold)]
    pub confidence: Option<f32>,

    #[command(flatten)]
    pub cache: CacheArgs,
}

impl EngineArgs {
    /// Applies config values for anything not set on the command line.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.confidence = self.confidence.or(config.detection.confidence);
        self.cache = self.cache.with_config(config);
        self
    }

    /// The effective confidence threshold.
    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.confidence.unwrap_or(DEFAULT_CONFIDENCE)
    }

    /// Resolves the model, fetching it if needed, and loads the detector.
    ///
    /// Downloads are reported on stderr when `show_progress` is set.
    pub fn load_detector(
        &self,
        config: &AppConfig,
        show_progress: bool,
    ) -> Result<DetectionAdapter> {
        let mut cache = self.cache.model_cache(config)?;
        let downloads = show_progress.then(DownloadProgress::new);
        if let Some(downloads) = &downloads {
            cache = cache.with_progress(downloads.callback());
        }

        let resolved = cache.resolve(self.model.as_deref());
        if let Some(downloads) = &downloads {
            downloads.clear();
        }
        let resolved = resolved?;

        let labels = resolved.load_labels()?;
        let engine = OrtEngine::load(&resolved.model_path, OrtEngineConfig::default())?;
        let detector = DetectionAdapter::new(Box::new(engine), labels);
        info!(
            "Loaded {} ({} classes)",
            resolved.model_path.display(),
            detector.labels().len()
        );
        Ok(detector)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("0.4"), Ok(0.4));
        assert_eq!(parse_threshold("0"), Ok(0.0));
        assert_eq!(parse_threshold("1"), Ok(1.0));
        assert_eq!(parse_threshold("abc").unwrap_err(), "'abc' is not a valid number");
        assert_eq!(parse_threshold("2").unwrap_err(), "2 is not in 0.0..=1.0");
    }

    #[test]
    fn test_cli_values_win_over_config() {
        let config: AppConfig = toml::from_str(
            "[detection]\nconfidence = 0.6\n\n[models]\ndir = '/from/config'\n",
        )
        .unwrap();

        let args = EngineArgs {
            confidence: Some(0.1),
            cache: CacheArgs {
                models_dir: Some(PathBuf::from("/from/cli")),
                token: None,
            },
            ..EngineArgs::default()
        }
        .with_config(&config);

        assert_eq!(args.confidence(), 0.1);
        assert_eq!(args.cache.cache_dir(), PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_config_fills_unset_values() {
        let config: AppConfig = toml::from_str(
            "[detection]\nconfidence = 0.6\n\n[models]\ndir = '/from/config'\n",
        )
        .unwrap();

        let args = EngineArgs::default().with_config(&config);

        assert_eq!(args.confidence(), 0.6);
        assert_eq!(args.cache.cache_dir(), PathBuf::from("/from/config"));
    }

    #[test]
    fn test_defaults() {
        let args = EngineArgs::default().with_config(&AppConfig::default());
        assert_eq!(args.confidence(), DEFAULT_CONFIDENCE);
        assert_eq!(args.cache.cache_dir(), default_cache_dir());
    }
}
