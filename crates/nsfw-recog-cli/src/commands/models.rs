//! Models command - manage the cached model.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::engine::CacheArgs;
use crate::config::AppConfig;
use crate::output::DownloadProgress;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// Download the checkpoint and class list if missing
    Fetch(CacheArgs),
    /// Show which artifacts are cached
    List(CacheArgs),
    /// Print the cache directory path
    Path(CacheArgs),
}

/// Run the models command.
pub fn run(args: &ModelsArgs, config: &AppConfig) -> Result<()> {
    match &args.command {
        ModelsCommand::Fetch(cache) => fetch_models(&cache.clone().with_config(config), config),
        ModelsCommand::List(cache) => list_models(&cache.clone().with_config(config), config),
        ModelsCommand::Path(cache) => {
            println!("{}", cache.clone().with_config(config).cache_dir().display());
            Ok(())
        }
    }
}

fn fetch_models(cache: &CacheArgs, config: &AppConfig) -> Result<()> {
    let downloads = DownloadProgress::new();
    let resolved = cache
        .model_cache(config)?
        .with_progress(downloads.callback())
        .resolve(None);
    match resolved {
        Ok(resolved) => {
            downloads.finish("Model ready");
            println!("{}", resolved.model_path.display());
            Ok(())
        }
        Err(e) => {
            downloads.clear();
            Err(e.into())
        }
    }
}

fn list_models(cache: &CacheArgs, config: &AppConfig) -> Result<()> {
    let model_cache = cache.model_cache(config)?;
    let status = model_cache.status();

    println!("Models directory: {}", model_cache.cache_dir().display());
    println!();

    for (entry, installed) in &status {
        let mark = if *installed { "✓" } else { "✗" };
        let filename = entry
            .local_path
            .file_name()
            .map_or_else(|| "unknown".into(), |f| f.to_string_lossy());
        println!("  {mark} {filename} ({})", entry.remote_url);
    }

    println!();
    let installed_count = status.iter().filter(|(_, installed)| *installed).count();
    println!("{}/{} files installed", installed_count, status.len());

    Ok(())
}
