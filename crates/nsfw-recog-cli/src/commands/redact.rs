//! Blur and annotate commands - write a redacted copy of one image.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::engine::EngineArgs;
use crate::config::AppConfig;

/// What to do with each detected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactMode {
    Blur,
    Annotate,
}

/// Arguments shared by `blur` and `annotate`.
#[derive(Args, Clone, Debug)]
pub struct RedactArgs {
    /// Image to read
    pub input: PathBuf,

    /// Where to write the result; the format follows the extension
    pub output: PathBuf,

    /// Suppress download progress
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl RedactArgs {
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.engine = self.engine.with_config(config);
        self
    }
}

/// Run `blur` or `annotate`.
pub fn run(args: &RedactArgs, config: &AppConfig, mode: RedactMode) -> Result<()> {
    let detector = args.engine.load_detector(config, !args.quiet)?;
    let confidence = args.engine.confidence();

    match mode {
        RedactMode::Blur => detector.blur(&args.input, &args.output, confidence)?,
        RedactMode::Annotate => detector.annotate(&args.input, &args.output, confidence)?,
    };

    info!("Wrote {}", args.output.display());
    Ok(())
}
