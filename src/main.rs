//! wallcache - Download wallpaper images through a memory and disk cache
//!
//! A command-line front end for the wallpaper cache: fetch images by URL or
//! from a catalog, report disk usage, and clear the cache.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wallcache::app::{App, AppError};
use wallcache::cli::Cli;
use wallcache::WallpaperCache;

/// Sets up logging to stderr, filtered by `RUST_LOG` (default: warnings only)
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

/// Runs the parsed command; returns whether every fetch succeeded
async fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = cli.cache_config()?;
    let cache = WallpaperCache::new(&config).ok_or(AppError::NoCacheDir)?;
    let app = App::new(cache);

    let mut stdout = io::stdout();
    Ok(app.run(&cli.command, &mut stdout).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
