//! Wallpaper cache manager
//!
//! Resolves an image URL through three tiers: the in-memory cache, the disk
//! cache, and finally the network. Newly fetched images are remembered in
//! memory and persisted to disk until the cache is cleared.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use image::DynamicImage;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::disk::DiskStore;
use super::error::WallpaperError;
use crate::data::{HttpSource, ImageSource, Wallpaper};

/// Default in-memory budget for decoded images (256 MiB)
pub const DEFAULT_MEMORY_CAPACITY: u64 = 256 * 1024 * 1024;

/// A decoded wallpaper image, shared between the cache and its callers
pub type Image = Arc<DynamicImage>;

type SharedFetch = Shared<BoxFuture<'static, Result<Image, WallpaperError>>>;

/// Where a URL currently stands in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Neither in memory nor on disk, and not being fetched
    Unfetched,
    /// A fetch for this URL is in flight
    Fetching,
    /// Available from memory or disk
    Cached,
}

/// Counters describing how requests were served
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Decoded images currently held in memory
    pub memory_entries: u64,
    /// Requests answered from memory
    pub memory_hits: u64,
    /// Requests answered from disk
    pub disk_hits: u64,
    /// Requests that went to the network, successful or not
    pub network_fetches: u64,
}

/// Configuration for the wallpaper cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory for entry files; the platform cache directory when `None`
    pub cache_dir: Option<PathBuf>,
    /// Budget in bytes for decoded images kept in memory
    pub memory_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Resolves the disk store this configuration points at
    ///
    /// Returns `None` if no directory was given and the platform cache
    /// directory cannot be determined.
    pub fn disk_store(&self) -> Option<DiskStore> {
        match &self.cache_dir {
            Some(dir) => Some(DiskStore::with_dir(dir.clone())),
            None => DiskStore::new(),
        }
    }
}

/// A fetch registered for a URL
struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

struct Inner<S> {
    source: S,
    memory: moka::sync::Cache<String, Image>,
    disk: DiskStore,
    /// Misses currently being resolved, keyed by URL
    in_flight: Mutex<HashMap<String, InFlight>>,
    /// Bumped by every clear; fetches from an older generation don't write back
    generation: RwLock<u64>,
    next_fetch_id: AtomicU64,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    network_fetches: AtomicU64,
}

/// Two-tier (memory + disk) cache for wallpaper images
///
/// Construct one per process and hand clones to every consumer; clones share
/// the same memory tier, disk directory and in-flight requests.
///
/// Concurrent misses for the same URL share a single fetch. Each fetch runs
/// on its own task and completes even if every caller stops waiting.
pub struct WallpaperCache<S = HttpSource> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for WallpaperCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl WallpaperCache<HttpSource> {
    /// Creates a cache that fetches over HTTP
    ///
    /// Returns `None` if the cache directory cannot be determined.
    pub fn new(config: &CacheConfig) -> Option<Self> {
        let disk = config.disk_store()?;
        Some(Self::with_source(HttpSource::new(), disk, config.memory_capacity))
    }
}

impl<S: ImageSource> WallpaperCache<S> {
    /// Creates a cache with a custom image source and disk store
    ///
    /// `memory_capacity` bounds the decoded size of images held in memory;
    /// least recently used images are dropped from memory (not disk) past it.
    pub fn with_source(source: S, disk: DiskStore, memory_capacity: u64) -> Self {
        let memory = moka::sync::Cache::builder()
            .max_capacity(memory_capacity)
            .weigher(|_url: &String, image: &Image| {
                u32::try_from(image.as_bytes().len()).unwrap_or(u32::MAX)
            })
            .build();

        Self {
            inner: Arc::new(Inner {
                source,
                memory,
                disk,
                in_flight: Mutex::new(HashMap::new()),
                generation: RwLock::new(0),
                next_fetch_id: AtomicU64::new(0),
                memory_hits: AtomicU64::new(0),
                disk_hits: AtomicU64::new(0),
                network_fetches: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the image behind `url`
    ///
    /// Tries memory, then disk, then the network. Disk problems are treated
    /// as misses; only network, decode and input errors are returned.
    pub async fn fetch(&self, url: &str) -> Result<Image, WallpaperError> {
        let url = parse_image_url(url)?;
        let key = url.as_str().to_string();

        if let Some(image) = self.inner.memory.get(&key) {
            self.inner.memory_hits.fetch_add(1, Ordering::Relaxed);
            debug!(url = %key, "Memory hit");
            return Ok(image);
        }

        self.join_or_start(key, url).await
    }

    /// Returns the full-resolution image of a catalog wallpaper
    pub async fn fetch_wallpaper(&self, wallpaper: &Wallpaper) -> Result<Image, WallpaperError> {
        self.fetch(&wallpaper.image_url).await
    }

    /// Reports whether `url` is cached, being fetched, or neither
    pub async fn state(&self, url: &str) -> Result<EntryState, WallpaperError> {
        let key = parse_image_url(url)?.as_str().to_string();

        if self.inner.memory.contains_key(&key) {
            return Ok(EntryState::Cached);
        }
        let fetching = self.inner.lock_in_flight().contains_key(&key);
        if fetching {
            return Ok(EntryState::Fetching);
        }
        if self.inner.disk.contains(&key).await {
            return Ok(EntryState::Cached);
        }
        Ok(EntryState::Unfetched)
    }

    /// Path of the entry file that holds `url` on disk
    pub fn entry_path(&self, url: &str) -> Result<PathBuf, WallpaperError> {
        let url = parse_image_url(url)?;
        Ok(self.inner.disk.path_for(url.as_str()))
    }

    /// Total size in bytes of all entry files on disk
    pub async fn disk_usage(&self) -> u64 {
        self.inner.disk.usage().await
    }

    /// Drops every image from memory and deletes every entry file
    ///
    /// Fetches still in flight finish for their callers but no longer write
    /// to memory or disk.
    pub async fn clear(&self) {
        let mut generation = self.inner.generation.write().await;
        *generation += 1;

        self.inner.memory.invalidate_all();
        self.inner.lock_in_flight().clear();

        match self.inner.disk.reset().await {
            Ok(()) => info!(dir = ?self.inner.disk.dir(), "Cache cleared"),
            Err(e) => warn!(dir = ?self.inner.disk.dir(), error = %e, "Failed to reset cache directory"),
        }
    }

    /// Drops the in-memory tier only; entries on disk stay
    pub fn purge_memory(&self) {
        self.inner.memory.invalidate_all();
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        self.inner.memory.run_pending_tasks();
        CacheStats {
            memory_entries: self.inner.memory.entry_count(),
            memory_hits: self.inner.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.inner.disk_hits.load(Ordering::Relaxed),
            network_fetches: self.inner.network_fetches.load(Ordering::Relaxed),
        }
    }

    /// Awaits the in-flight fetch for `key`, starting one if there is none
    fn join_or_start(&self, key: String, url: Url) -> SharedFetch {
        let mut in_flight = self.inner.lock_in_flight();
        if let Some(existing) = in_flight.get(&key) {
            debug!(url = %key, "Joining in-flight fetch");
            return existing.fetch.clone();
        }

        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = inner.resolve(&task_key, &url).await;
            inner.finish(&task_key, id);
            result
        });

        let report_url = key.clone();
        let fetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => Err(WallpaperError::Network {
                    url: report_url,
                    source: Arc::new(e),
                }),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(
            key,
            InFlight {
                id,
                fetch: fetch.clone(),
            },
        );
        fetch
    }
}

impl<S: ImageSource> Inner<S> {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes the registration for a finished fetch
    ///
    /// A clear may already have dropped it and a newer fetch may hold the
    /// key, so only the matching id is removed.
    fn finish(&self, key: &str, id: u64) {
        let mut in_flight = self.lock_in_flight();
        if in_flight.get(key).is_some_and(|entry| entry.id == id) {
            in_flight.remove(key);
        }
    }

    /// Resolves a memory miss from disk or the network
    async fn resolve(&self, key: &str, url: &Url) -> Result<Image, WallpaperError> {
        let generation = *self.generation.read().await;

        // Another fetch may have finished between the caller's lookup and now
        if let Some(image) = self.memory.get(key) {
            self.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(image);
        }

        if let Some(bytes) = self.disk.read(key).await {
            match image::load_from_memory(&bytes) {
                Ok(decoded) => {
                    self.disk_hits.fetch_add(1, Ordering::Relaxed);
                    debug!(url = %key, size = bytes.len(), "Disk hit");
                    let image = Arc::new(decoded);
                    self.remember(key, &image, generation).await;
                    return Ok(image);
                }
                Err(e) => {
                    warn!(url = %key, error = %e, "Cached file is not a valid image, refetching");
                }
            }
        }

        self.network_fetches.fetch_add(1, Ordering::Relaxed);
        debug!(url = %key, "Fetching from network");

        let bytes = self
            .source
            .get(url)
            .await
            .map_err(|e| WallpaperError::Network {
                url: key.to_string(),
                source: Arc::from(e),
            })?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| WallpaperError::Decode {
            url: key.to_string(),
            source: Arc::new(e),
        })?;
        let image = Arc::new(decoded);

        if self.remember(key, &image, generation).await {
            self.persist(key, &bytes, generation).await;
        }
        Ok(image)
    }

    /// Puts a decoded image in memory unless the cache was cleared meanwhile
    async fn remember(&self, key: &str, image: &Image, generation: u64) -> bool {
        let current = self.generation.read().await;
        if *current != generation {
            debug!(url = %key, "Cache cleared during fetch, not storing");
            return false;
        }
        self.memory.insert(key.to_string(), Arc::clone(image));
        true
    }

    /// Best-effort write of the raw bytes to disk
    async fn persist(&self, key: &str, bytes: &[u8], generation: u64) {
        let staged = match self.disk.stage(key, bytes).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(url = %key, error = %e, "Failed to write image to disk");
                return;
            }
        };

        // Held until the rename so a clear cannot slip in between
        let current = self.generation.read().await;
        if *current != generation {
            debug!(url = %key, "Cache cleared during fetch, discarding disk write");
            staged.discard().await;
            return;
        }
        match staged.commit().await {
            Ok(()) => debug!(url = %key, size = bytes.len(), "Stored image on disk"),
            Err(e) => warn!(url = %key, error = %e, "Failed to write image to disk"),
        }
    }
}

/// Parses `url`, accepting only absolute http(s) URLs
fn parse_image_url(url: &str) -> Result<Url, WallpaperError> {
    let parsed = Url::parse(url).map_err(|e| WallpaperError::InvalidInput {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(WallpaperError::InvalidInput {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
