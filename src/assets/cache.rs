/// On-disk stale-while-revalidate cache for fetched assets
///
/// Entries live in one directory, named by the SHA-256 of their URL.
/// An entry is fresh for `max_age`; the modification time of the file is the
/// time it was last (re)validated. When `max_entries` is set the oldest
/// entries are evicted after every write.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::CacheError;

/// Image entries kept by the image cache
pub const IMAGE_CACHE_MAX_ENTRIES: usize = 2000;

/// One year
pub const DEFAULT_MAX_AGE_DAYS: i64 = 365;

/// Distinguishes temp files of concurrent writes to the same entry
static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
    max_entries: Option<usize>,
    max_age: Duration,
    /// Shared by every clone so only one eviction scans the directory at a time
    eviction: Arc<Mutex<()>>,
}

impl AssetCache {
    /// Bounded cache for image assets
    pub fn images(root: &Path) -> Self {
        Self {
            dir: root.join("images"),
            max_entries: Some(IMAGE_CACHE_MAX_ENTRIES),
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
            eviction: Arc::new(Mutex::new(())),
        }
    }

    /// Unbounded cache for the catalog and other static files
    pub fn static_files(root: &Path) -> Self {
        Self {
            dir: root.join("static"),
            max_entries: None,
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
            eviction: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub(crate) fn entry_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.bin", hex::encode(digest)))
    }

    /// Fresh cached bytes for `url`, if any. Expired entries are removed.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(url);
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        let modified: DateTime<Utc> = metadata.modified().ok()?.into();

        if Utc::now() - modified > self.max_age {
            tracing::debug!("cache entry for {} expired", url);
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }

        tokio::fs::read(&path).await.ok()
    }

    /// Store `bytes` for `url`, then enforce the entry bound
    pub async fn put(&self, url: &str, bytes: &[u8]) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write to a private temp file, then move it into place
        let path = self.entry_path(url);
        let tmp = path.with_extension(format!("{}.tmp", NEXT_TMP.fetch_add(1, Ordering::Relaxed)));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        if let Some(max_entries) = self.max_entries {
            self.evict_oldest(max_entries).await?;
        }
        Ok(())
    }

    async fn evict_oldest(&self, max_entries: usize) -> Result<(), CacheError> {
        let _guard = self.eviction.lock().await;

        // Collect entry files with their last validation time
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("bin") {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // removed by an expired `get` in the meantime
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            entries.push((metadata.modified()?, path));
        }

        if entries.len() <= max_entries {
            return Ok(());
        }

        // Oldest first
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let excess = entries.len() - max_entries;
        for (_, path) in entries.into_iter().take(excess) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!("evicted {} cache entries from {}", excess, self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration as StdDuration, SystemTime};

    fn age_entry(cache: &AssetCache, url: &str, days: u64) {
        let file = std::fs::File::options()
            .write(true)
            .open(cache.entry_path(url))
            .unwrap();
        file.set_modified(SystemTime::now() - StdDuration::from_secs(days * 86_400))
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::images(tmp.path());

        assert!(cache.get("https://example.com/a.png").await.is_none());
        cache.put("https://example.com/a.png", b"abc").await.unwrap();
        assert_eq!(cache.get("https://example.com/a.png").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::images(tmp.path());

        cache.put("u", b"old").await.unwrap();
        age_entry(&cache, "u", 400);

        assert!(cache.get("u").await.is_none());
        assert!(!cache.entry_path("u").exists());
    }

    #[tokio::test]
    async fn test_oldest_entries_evicted_past_bound() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::images(tmp.path()).with_max_entries(Some(2));

        cache.put("a", b"1").await.unwrap();
        cache.put("b", b"2").await.unwrap();
        age_entry(&cache, "a", 10);
        age_entry(&cache, "b", 5);
        cache.put("c", b"3").await.unwrap();

        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_some());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_puts_all_succeed_and_stay_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::images(tmp.path()).with_max_entries(Some(2));

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.put(&format!("https://example.com/{}.png", i), b"x").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = std::fs::read_dir(tmp.path().join("images"))
            .unwrap()
            .filter(|entry| {
                entry.as_ref().unwrap().path().extension().and_then(|ext| ext.to_str()) == Some("bin")
            })
            .count();
        assert_eq!(stored, 2);
    }

    #[tokio::test]
    async fn test_concurrent_puts_of_same_url() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::images(tmp.path());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.put("https://example.com/same.png", b"abc").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(cache.get("https://example.com/same.png").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_static_cache_is_unbounded() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::static_files(tmp.path());
        for i in 0..5 {
            cache.put(&format!("file-{}", i), b"x").await.unwrap();
        }
        for i in 0..5 {
            assert!(cache.get(&format!("file-{}", i)).await.is_some());
        }
    }
}
