//! CLI command definitions and handlers.

pub mod detect;
pub mod engine;
pub mod models;
pub mod redact;

use clap::{Parser, Subcommand};

/// nsfw-recog - Detect and redact NSFW regions in images
#[derive(Parser)]
#[command(name = "nsfw-recog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Report NSFW regions found in images
    Detect(detect::DetectArgs),
    /// Write a copy of an image with every detected region blurred
    Blur(redact::RedactArgs),
    /// Write a copy of an image with every detected region outlined
    Annotate(redact::RedactArgs),
    /// Manage the cached model
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Nothing was flagged.
    Success = 0,
    /// At least one region was detected.
    DetectionsFound = 1,
    /// The command failed.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
