//! Detect command - report NSFW regions found in images.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use nsfw_recog_adapters::FsImageSource;
use nsfw_recog_core::{
    DetectionAdapter, DetectionReport, ImageSource, ProgressEvent, ProgressSink, ResultOutput,
    UnreadableImage,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use super::engine::EngineArgs;
use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{BatchProgress, JsonOutput};

/// Output format for detection reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// A single JSON array
    Json,
}

/// Arguments for the detect command.
#[derive(Args, Clone, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct DetectArgs {
    /// Image files or directories to scan
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Always show the progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress and per-image status
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format [default: jsonl]
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print the JSON array
    #[arg(long)]
    pub pretty: bool,
}

impl DetectArgs {
    /// Merges config values under the command-line values.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if !self.recursive {
            self.recursive = config.general.recursive.unwrap_or(false);
        }

        self.engine = self.engine.with_config(config);

        if self.format.is_none() {
            self.format = config
                .output
                .format
                .as_deref()
                .and_then(|s| OutputFormat::from_str(s, true).ok());
        }

        if !self.pretty {
            self.pretty = config.output.pretty.unwrap_or(false);
        }
        if !self.progress {
            self.progress = config.output.progress.unwrap_or(false);
        }

        self
    }

    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Totals for one detect run.
#[allow(dead_code)] // Fields exposed for programmatic use
#[derive(Debug)]
pub struct DetectSummary {
    pub processed: usize,
    pub skipped: usize,
    pub flagged: usize,
    pub exit_code: ExitCode,
}

/// Run the detect command.
pub fn run(args: &DetectArgs, config: &AppConfig) -> Result<DetectSummary> {
    info!("Running detect command on {} paths", args.paths.len());

    let detector = args.engine.load_detector(config, !args.quiet)?;

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = BatchProgress::new(total, args.quiet, show_progress);
    let output = JsonOutput::stdout();

    process_images(&source, &detector, &output, &progress, args)
}

/// Runs the detector over every image from `source`.
///
/// Images that fail to load are skipped. A detector failure aborts the run.
pub fn process_images(
    source: &dyn ImageSource,
    detector: &DetectionAdapter,
    output: &JsonOutput,
    progress: &dyn ProgressSink,
    args: &DetectArgs,
) -> Result<DetectSummary> {
    let total = source.count_hint();
    let confidence = args.engine.confidence();
    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut flagged = 0usize;
    let mut reports: Vec<DetectionReport> = Vec::new();

    for (index, item) in source.images().enumerate() {
        let image = match item {
            Ok(img) => img,
            Err(UnreadableImage { path, reason }) => {
                progress.on_event(ProgressEvent::Skipped { path, reason });
                skipped += 1;
                continue;
            }
        };

        progress.on_event(ProgressEvent::Started {
            path: image.path.clone(),
            index,
            total,
        });

        let detections = detector.detect(&image.image, confidence)?;
        let report = DetectionReport {
            path: image.path.clone(),
            timestamp: iso_timestamp(),
            dimensions: image.dimensions(),
            detections,
        };

        if report.is_flagged() {
            flagged += 1;
        }

        progress.on_event(ProgressEvent::Completed {
            report: report.clone(),
        });

        match args.format() {
            OutputFormat::Jsonl => output.write(&report)?,
            OutputFormat::Json => reports.push(report),
        }

        processed += 1;
    }

    if args.format() == OutputFormat::Json {
        output.write_array(&reports, args.pretty)?;
    }

    output.flush()?;

    progress.on_event(ProgressEvent::Finished { processed, skipped });

    let exit_code = if flagged > 0 {
        ExitCode::DetectionsFound
    } else {
        ExitCode::Success
    };

    Ok(DetectSummary {
        processed,
        skipped,
        flagged,
        exit_code,
    })
}

fn iso_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
