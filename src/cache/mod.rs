//! Cache module for wallpaper images
//!
//! This module provides a two-tier cache: decoded images are kept in memory,
//! and the raw bytes are persisted to the filesystem so that a later process
//! can serve them without touching the network. Entries live until the whole
//! cache is cleared; there is no expiry and no disk size limit.

mod disk;
mod error;
mod manager;

pub use disk::{DiskStore, StagedWrite};
pub use error::WallpaperError;
pub use manager::{
    CacheConfig, CacheStats, EntryState, Image, WallpaperCache, DEFAULT_MEMORY_CAPACITY,
};
