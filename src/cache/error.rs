//! Errors surfaced by the wallpaper cache
//!
//! Only network, decode and input errors reach callers. Disk problems are
//! logged and treated as misses inside the cache.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur when fetching a wallpaper image
///
/// `Clone` so that one in-flight result can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum WallpaperError {
    /// The request could not be completed or returned a failure status
    #[error("Network request for {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The bytes are not a valid image
    #[error("Could not decode image from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: Arc<image::ImageError>,
    },

    /// The caller supplied something that is not an http(s) URL
    #[error("Invalid image URL '{url}': {reason}")]
    InvalidInput { url: String, reason: String },
}

impl WallpaperError {
    /// The URL the failed request was for
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. } | Self::Decode { url, .. } | Self::InvalidInput { url, .. } => {
                url
            }
        }
    }
}
