//! wallcache library
//!
//! Exposes the wallpaper cache, its data models and the CLI plumbing for use
//! in integration tests and by other consumers.

pub mod app;
pub mod cache;
pub mod cli;
pub mod data;

pub use cache::{CacheConfig, EntryState, Image, WallpaperCache, WallpaperError};
