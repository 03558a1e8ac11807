//! nsfw-recog CLI - detect, blur and annotate NSFW regions in images.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::redact::RedactMode;
use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load();

    let result = match cli.command {
        Commands::Detect(args) => {
            commands::detect::run(&args.with_config(&config), &config).map(|s| s.exit_code)
        }
        Commands::Blur(args) => {
            commands::redact::run(&args.with_config(&config), &config, RedactMode::Blur)
                .map(|()| ExitCode::Success)
        }
        Commands::Annotate(args) => {
            commands::redact::run(&args.with_config(&config), &config, RedactMode::Annotate)
                .map(|()| ExitCode::Success)
        }
        Commands::Models(args) => {
            commands::models::run(&args, &config).map(|()| ExitCode::Success)
        }
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    };

    exit_code.into()
}
