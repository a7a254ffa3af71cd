//! Wallpaper data models and image sources
//!
//! This module contains the wallpaper record shared by the catalog and the
//! cache, plus the network seam the cache fetches image bytes through.

pub mod source;

pub use source::{BoxError, HttpSource, ImageSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A wallpaper as listed in a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallpaper {
    /// Unique identifier for the wallpaper
    pub id: String,
    /// Display title
    pub title: String,
    /// Who made it
    pub author: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Full-resolution image URL
    pub image_url: String,
    /// Small preview image URL
    pub thumbnail_url: String,
    /// Category name (e.g. "nature")
    pub category: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the wallpaper was published
    pub upload_date: DateTime<Utc>,
    /// Number of downloads
    pub download_count: u64,
    /// Number of likes
    pub like_count: u64,
    /// Whether the user has favorited this wallpaper
    #[serde(default)]
    pub is_favorited: bool,
}

/// Loads a catalog file containing a JSON array of wallpapers
pub fn load_catalog(path: &Path) -> Result<Vec<Wallpaper>, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_catalog(&content)
}

/// Parses a catalog from JSON text
pub fn parse_catalog(json: &str) -> Result<Vec<Wallpaper>, CatalogError> {
    Ok(serde_json::from_str(json)?)
}

/// Errors that can occur when loading a wallpaper catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Failed to read catalog '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not a valid JSON array of wallpapers
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
