//! Command execution for wallcache
//!
//! This module runs a parsed CLI command against a wallpaper cache, fetching
//! URLs concurrently and formatting the results for the terminal.

use std::io::{self, Write};

use futures::future::join_all;
use thiserror::Error;
use tracing::info;

use crate::cache::{Image, WallpaperCache, WallpaperError};
use crate::cli::Command;
use crate::data::{load_catalog, CatalogError, HttpSource, ImageSource, Wallpaper};

/// Errors that stop a command from running at all
#[derive(Debug, Error)]
pub enum AppError {
    /// No cache directory was given and the platform has none
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,

    /// The catalog could not be loaded
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Writing results to the terminal failed
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Result of fetching one URL
#[derive(Debug)]
pub struct FetchOutcome {
    /// The URL as requested
    pub url: String,
    /// The decoded image or why it could not be produced
    pub result: Result<Image, WallpaperError>,
}

/// Runs commands against a shared cache
pub struct App<S = HttpSource> {
    cache: WallpaperCache<S>,
}

impl<S: ImageSource> App<S> {
    /// Creates an App around an existing cache handle
    pub fn new(cache: WallpaperCache<S>) -> Self {
        Self { cache }
    }

    /// The cache this App works with
    pub fn cache(&self) -> &WallpaperCache<S> {
        &self.cache
    }

    /// Fetches all URLs concurrently, keeping the input order
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<FetchOutcome> {
        let fetches = urls.iter().map(|url| async move {
            FetchOutcome {
                url: url.clone(),
                result: self.cache.fetch(url).await,
            }
        });
        join_all(fetches).await
    }

    /// Fetches the full-resolution image of every catalog wallpaper
    pub async fn fetch_catalog(&self, wallpapers: &[Wallpaper]) -> Vec<FetchOutcome> {
        let fetches = wallpapers.iter().map(|wallpaper| async move {
            FetchOutcome {
                url: wallpaper.image_url.clone(),
                result: self.cache.fetch_wallpaper(wallpaper).await,
            }
        });
        join_all(fetches).await
    }

    /// Runs `command`, writing its report to `out`
    ///
    /// # Returns
    /// * `Ok(true)` if everything succeeded
    /// * `Ok(false)` if at least one image could not be fetched
    /// * `Err(AppError)` if the command could not run
    pub async fn run(&self, command: &Command, out: &mut impl Write) -> Result<bool, AppError> {
        match command {
            Command::Fetch { urls } => {
                let outcomes = self.fetch_all(urls).await;
                Ok(write_outcomes(&outcomes, out)?)
            }
            Command::Catalog { path } => {
                let wallpapers = load_catalog(path)?;
                info!(count = wallpapers.len(), path = %path.display(), "Loaded catalog");
                let outcomes = self.fetch_catalog(&wallpapers).await;
                Ok(write_outcomes(&outcomes, out)?)
            }
            Command::Usage => {
                writeln!(out, "{}", self.cache.disk_usage().await)?;
                Ok(true)
            }
            Command::Clear => {
                self.cache.clear().await;
                writeln!(out, "Cache cleared")?;
                Ok(true)
            }
        }
    }
}

/// Writes one line per outcome; returns whether all of them succeeded
fn write_outcomes(outcomes: &[FetchOutcome], out: &mut impl Write) -> io::Result<bool> {
    let mut all_ok = true;
    for outcome in outcomes {
        match &outcome.result {
            Ok(image) => writeln!(out, "{}: {}x{}", outcome.url, image.width(), image.height())?,
            Err(e) => {
                all_ok = false;
                writeln!(out, "{}: error: {}", outcome.url, e)?;
            }
        }
    }
    Ok(all_ok)
}
