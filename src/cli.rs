//! Command-line interface parsing for wallcache
//!
//! This module handles parsing of CLI arguments using clap: the subcommand to
//! run plus the global flags that configure the cache.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::CacheConfig;

/// Bytes per megabyte for `--memory-limit-mb`
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default in-memory budget in megabytes
const DEFAULT_MEMORY_LIMIT_MB: u64 = 256;

/// Largest accepted `--memory-limit-mb` (1 TiB)
const MAX_MEMORY_LIMIT_MB: u64 = 1024 * 1024;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The memory limit is zero or too large to represent in bytes
    #[error("Invalid memory limit: {0} MB. Use a value between 1 and 1048576")]
    InvalidMemoryLimit(u64),
}

/// wallcache - Download and cache wallpaper images
#[derive(Parser, Debug)]
#[command(name = "wallcache")]
#[command(about = "Download wallpaper images through a memory and disk cache")]
#[command(version)]
pub struct Cli {
    /// Directory for cached images (defaults to the platform cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Memory budget for decoded images, in megabytes
    #[arg(long, global = true, value_name = "MB", default_value_t = DEFAULT_MEMORY_LIMIT_MB)]
    pub memory_limit_mb: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Actions the CLI can perform
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch one or more image URLs through the cache
    ///
    /// Examples:
    ///   wallcache fetch https://example.com/a.jpg
    ///   wallcache fetch https://example.com/a.jpg https://example.com/b.png
    Fetch {
        /// Image URLs to fetch
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },
    /// Fetch every wallpaper listed in a JSON catalog file
    Catalog {
        /// Path to a JSON array of wallpaper records
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print the disk space used by cached images, in bytes
    Usage,
    /// Delete every cached image
    Clear,
}

impl Cli {
    /// Builds the cache configuration from the global flags.
    ///
    /// # Returns
    /// * `Ok(CacheConfig)` with the requested directory and memory budget
    /// * `Err(CliError::InvalidMemoryLimit)` if the limit is zero or overflows
    pub fn cache_config(&self) -> Result<CacheConfig, CliError> {
        let mb = self.memory_limit_mb;
        if !(1..=MAX_MEMORY_LIMIT_MB).contains(&mb) {
            return Err(CliError::InvalidMemoryLimit(mb));
        }
        let memory_capacity = mb * BYTES_PER_MB;

        Ok(CacheConfig {
            cache_dir: self.cache_dir.clone(),
            memory_capacity,
        })
    }
}
