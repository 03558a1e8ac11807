//! Configuration file support for nsfw-recog.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/nsfw-recog/config.toml` (lowest priority)
//! - Project-local: `.nsfw-recog.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};
use std::time::Duration;

use nsfw_recog_adapters::{HttpConfig, ModelSources};
use serde::Deserialize;
use tracing::{debug, info};

const PROJECT_CONFIG: &str = ".nsfw-recog.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Detection settings.
    pub detection: DetectionConfig,
    /// Model source and cache settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Detection configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum confidence for a region to be reported (0.0-1.0).
    pub confidence: Option<f32>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Cache directory for downloaded artifacts.
    pub dir: Option<PathBuf>,
    /// Checkpoint download URL.
    pub model_url: Option<String>,
    /// Class list download URL.
    pub classes_url: Option<String>,
    /// Expected SHA-256 of the checkpoint.
    pub model_sha256: Option<String>,
    /// Expected SHA-256 of the class list.
    pub classes_sha256: Option<String>,
    /// Total timeout for one download, in seconds.
    pub timeout_secs: Option<u64>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl ModelsConfig {
    /// Download sources, falling back to the published release.
    pub fn sources(&self) -> ModelSources {
        let defaults = ModelSources::default();
        ModelSources {
            model_url: self.model_url.clone().unwrap_or(defaults.model_url),
            classes_url: self.classes_url.clone().unwrap_or(defaults.classes_url),
            model_sha256: self.model_sha256.clone(),
            classes_sha256: self.classes_sha256.clone(),
        }
    }

    /// HTTP settings with the configured timeout and the given token.
    pub fn http(&self, token: Option<String>) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: self
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            token,
            ..defaults
        }
    }
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/nsfw-recog/config.toml`
    /// 2. Project-local: `.nsfw-recog.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are reported as
    /// warnings and dropped.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        for warning in config.sanitize() {
            eprintln!("warning: {warning}");
        }

        config
    }

    /// Drops every out-of-range value so the built-in default applies instead.
    ///
    /// Returns one message per dropped key.
    fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(c) = self.detection.confidence {
            if !(0.0..=1.0).contains(&c) {
                warnings.push(format!(
                    "detection.confidence must be 0.0-1.0, got {c}; ignoring it"
                ));
                self.detection.confidence = None;
            }
        }

        for (key, value) in [
            ("models.model_sha256", &mut self.models.model_sha256),
            ("models.classes_sha256", &mut self.models.classes_sha256),
        ] {
            if let Some(hash) = value.as_deref() {
                if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    warnings.push(format!(
                        "{key} must be 64 hex characters, got '{hash}'; ignoring it"
                    ));
                    *value = None;
                }
            }
        }

        if self.models.timeout_secs == Some(0) {
            warnings.push("models.timeout_secs must be greater than 0; ignoring it".to_string());
            self.models.timeout_secs = None;
        }

        if let Some(f) = self.output.format.as_deref() {
            if f != "json" && f != "jsonl" {
                warnings.push(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'; ignoring it"
                ));
                self.output.format = None;
            }
        }

        warnings
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        self.detection.confidence = other.detection.confidence.or(self.detection.confidence);

        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.model_url = other.models.model_url.or_else(|| self.models.model_url.take());
        self.models.classes_url = other
            .models
            .classes_url
            .or_else(|| self.models.classes_url.take());
        self.models.model_sha256 = other
            .models
            .model_sha256
            .or_else(|| self.models.model_sha256.take());
        self.models.classes_sha256 = other
            .models
            .classes_sha256
            .or_else(|| self.models.classes_sha256.take());
        self.models.timeout_secs = other.models.timeout_secs.or(self.models.timeout_secs);

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nsfw-recog").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.nsfw-recog.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
