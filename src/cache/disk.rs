//! Disk tier of the wallpaper cache
//!
//! Stores raw image bytes, one file per URL, in a single directory under the
//! platform cache root. There is no index file: a file being present is the
//! only record that an entry exists.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

/// Suffix for in-progress writes
const TEMP_SUFFIX: &str = "tmp";

/// Distinguishes temporary files of overlapping writes
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reads and writes cached image files
///
/// Files live in an XDG-compliant cache directory (`~/.cache/wallcache/wallpapers/`
/// on Linux). Each file is named by the SHA-256 of the full URL, so URLs that
/// only share a final path segment never collide.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where entry files are stored
    dir: PathBuf,
}

impl DiskStore {
    /// Creates a DiskStore in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "wallcache")?;
        let dir = project_dirs.cache_dir().join("wallpapers");
        Some(Self { dir })
    }

    /// Creates a DiskStore with a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The directory entry files are kept in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file name used for a URL
    pub fn file_name(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// Returns the path to the entry file for a URL
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(Self::file_name(url))
    }

    /// Ensures the cache directory exists
    async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Whether an entry file exists for `url`
    pub async fn contains(&self, url: &str) -> bool {
        let path = self.path_for(url);
        match fs::try_exists(&path).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to stat cache entry");
                false
            }
        }
    }

    /// Reads the raw bytes stored for `url`
    ///
    /// Returns `None` if the file doesn't exist or cannot be read.
    pub async fn read(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.path_for(url);
        match fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                None
            }
        }
    }

    /// Writes `bytes` to a temporary sibling of the entry file for `url`
    ///
    /// Nothing is visible under the entry's name until the returned
    /// [`StagedWrite`] is committed.
    pub async fn stage(&self, url: &str, bytes: &[u8]) -> io::Result<StagedWrite> {
        self.ensure_dir().await?;

        let target = self.path_for(url);
        let temp = self.dir.join(format!(
            "{}.{}.{}",
            Self::file_name(url),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TEMP_SUFFIX
        ));

        if let Err(e) = fs::write(&temp, bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }
        Ok(StagedWrite { temp, target })
    }

    /// Writes `bytes` as the entry for `url`, replacing any previous entry
    pub async fn write(&self, url: &str, bytes: &[u8]) -> io::Result<()> {
        self.stage(url, bytes).await?.commit().await
    }

    /// Sums the sizes of the entry files in the cache directory
    ///
    /// A missing directory counts as empty, and files that cannot be
    /// stat'd count as zero. In-progress writes are not counted.
    pub async fn usage(&self) -> u64 {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(dir = %self.dir.display(), error = %e, "Failed to list cache directory");
                }
                return 0;
            }
        };

        let mut total = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if is_temp_file(&entry.path()) {
                continue;
            }
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_file() {
                    total += metadata.len();
                }
            }
        }
        total
    }

    /// Deletes the cache directory and recreates it empty
    pub async fn reset(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.ensure_dir().await
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TEMP_SUFFIX)
}

/// Entry bytes written to a temporary file, waiting to be renamed into place
#[derive(Debug)]
#[must_use = "a staged write leaves a temporary file until committed or discarded"]
pub struct StagedWrite {
    temp: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    /// Renames the temporary file over the entry file
    pub async fn commit(self) -> io::Result<()> {
        if let Err(e) = fs::rename(&self.temp, &self.target).await {
            let _ = fs::remove_file(&self.temp).await;
            return Err(e);
        }
        Ok(())
    }

    /// Removes the temporary file without touching the entry
    pub async fn discard(self) {
        let _ = fs::remove_file(&self.temp).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (DiskStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DiskStore::with_dir(temp_dir.path().join("wallpapers"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_file() {
        let (store, _temp_dir) = create_test_store();
        let url = "https://images.example.com/full/misty.jpg";

        store
            .write(url, b"image bytes")
            .await
            .expect("Write should succeed");

        assert!(store.dir().exists(), "Cache directory should be created lazily");
        assert!(store.path_for(url).exists(), "Entry file should exist");
        assert_eq!(store.read(url).await.as_deref(), Some(&b"image bytes"[..]));
    }

    #[tokio::test]
    async fn test_read_returns_none_for_missing_entry() {
        let (store, _temp_dir) = create_test_store();

        assert!(store.read("https://images.example.com/missing.jpg").await.is_none());
        assert!(!store.contains("https://images.example.com/missing.jpg").await);
    }

    #[tokio::test]
    async fn test_discarded_write_leaves_no_files() {
        let (store, _temp_dir) = create_test_store();
        let url = "https://images.example.com/full/stale.jpg";

        let staged = store
            .stage(url, b"stale bytes")
            .await
            .expect("Staging should succeed");
        assert!(!store.contains(url).await, "Staged bytes must not be visible yet");

        staged.discard().await;

        assert!(!store.contains(url).await);
        assert_eq!(store.usage().await, 0, "Temporary file should be removed");
    }

    #[tokio::test]
    async fn test_commit_makes_staged_write_visible() {
        let (store, _temp_dir) = create_test_store();
        let url = "https://images.example.com/full/fresh.jpg";

        let staged = store.stage(url, b"fresh").await.unwrap();
        staged.commit().await.expect("Commit should succeed");

        assert_eq!(store.read(url).await.as_deref(), Some(&b"fresh"[..]));
        assert_eq!(store.usage().await, 5, "Only the entry file should remain");
    }

    #[tokio::test]
    async fn test_usage_ignores_uncommitted_writes() {
        let (store, _temp_dir) = create_test_store();
        store.write("https://x.example.com/1.jpg", &[0u8; 10]).await.unwrap();

        let staged = store
            .stage("https://x.example.com/2.jpg", &[0u8; 500])
            .await
            .unwrap();
        fs::write(store.dir().join("abc.7.tmp"), [0u8; 40]).await.unwrap();

        assert_eq!(store.usage().await, 10, "Only committed entries count");

        staged.commit().await.unwrap();
        assert_eq!(store.usage().await, 510);
    }

    #[tokio::test]
    async fn test_unreadable_entry_reads_as_none() {
        let (store, _temp_dir) = create_test_store();
        let url = "https://x.example.com/odd.jpg";
        std::fs::create_dir_all(store.path_for(url)).unwrap();

        assert!(store.read(url).await.is_none(), "A directory is not a readable entry");
    }

    #[test]
    fn test_same_last_segment_maps_to_distinct_files() {
        let store = DiskStore::with_dir(PathBuf::from("/cache"));

        let a = store.path_for("https://a.example.com/img/sunset.jpg");
        let b = store.path_for("https://b.example.com/other/sunset.jpg");

        assert_ne!(a, b);
    }

    #[test]
    fn test_file_name_is_sha256_hex() {
        let name = DiskStore::file_name("https://images.example.com/full/misty.jpg");

        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(name, DiskStore::file_name("https://images.example.com/full/misty.jpg"));
    }

    #[tokio::test]
    async fn test_usage_sums_file_sizes() {
        let (store, _temp_dir) = create_test_store();

        store.write("https://x.example.com/1.jpg", &[0u8; 100]).await.unwrap();
        store.write("https://x.example.com/2.jpg", &[0u8; 23]).await.unwrap();

        assert_eq!(store.usage().await, 123);
    }

    #[tokio::test]
    async fn test_usage_of_missing_directory_is_zero() {
        let (store, _temp_dir) = create_test_store();

        assert_eq!(store.usage().await, 0);
    }

    #[tokio::test]
    async fn test_reset_empties_and_recreates_directory() {
        let (store, _temp_dir) = create_test_store();
        store.write("https://x.example.com/1.jpg", b"abc").await.unwrap();

        store.reset().await.expect("Reset should succeed");

        assert!(store.dir().exists(), "Directory should be recreated");
        assert_eq!(store.usage().await, 0);
    }

    #[tokio::test]
    async fn test_overwrite_existing_entry() {
        let (store, _temp_dir) = create_test_store();
        let url = "https://x.example.com/1.jpg";

        store.write(url, b"first").await.unwrap();
        store.write(url, b"second").await.unwrap();

        assert_eq!(store.read(url).await.as_deref(), Some(&b"second"[..]));
        assert_eq!(store.usage().await, 6);
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = DiskStore::new() {
            let path_str = store.dir().to_string_lossy();
            assert!(
                path_str.contains("wallcache"),
                "Cache path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
