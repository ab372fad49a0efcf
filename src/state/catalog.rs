use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::data::CatalogEntry;
use crate::assets::source::{fetch_remote_cached, read_file};
use crate::assets::{AssetBase, AssetCache, AssetLocation};
use crate::error::{CatalogError, FetchError};

/// Attempts made before the load is reported as failed
pub const LOAD_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubled for every further attempt
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// The catalog file the application browses.
///
/// The catalog is fetched once and never written back. Remote catalogs go
/// through the static-file cache so a previously opened catalog is
/// available offline.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    location: AssetLocation,
    client: Client,
    cache: Option<AssetCache>,
}

impl CatalogSource {
    pub fn new(location: AssetLocation, client: Client, cache: Option<AssetCache>) -> Self {
        Self { location, client, cache }
    }

    /// Base that image references in this catalog resolve against
    pub fn asset_base(&self) -> AssetBase {
        AssetBase::for_catalog(&self.location)
    }

    /// Fetch and parse the catalog once
    pub async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let bytes = match &self.location {
            AssetLocation::File(path) => read_file(path).await.map_err(|e| match e {
                FetchError::Io { path, source } => CatalogError::Io { path, source },
                other => CatalogError::Fetch(other),
            })?,
            AssetLocation::Remote(url) => {
                fetch_remote_cached(&self.client, self.cache.as_ref(), url).await?
            }
        };

        let entries = parse_catalog(&bytes)?;
        tracing::info!(
            "📁 Loaded {} catalog entries from {}",
            entries.len(),
            self.location.describe()
        );
        Ok(entries)
    }

    /// Load with exponential backoff
    pub async fn load_with_retry(&self) -> Result<Arc<[CatalogEntry]>, CatalogError> {
        let entries = retry_with_backoff(|| self.load()).await?;
        Ok(entries.into())
    }
}

/// Run `operation` up to `LOAD_ATTEMPTS` times, sleeping `RETRY_BASE_DELAY`
/// (doubled every time) between attempts.
///
/// Parse errors are not retried: the same bytes would fail again.
async fn retry_with_backoff<T, F, Fut>(mut operation: F) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut delay = RETRY_BASE_DELAY;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e @ CatalogError::Parse(_)) => return Err(e),
            Err(e) if attempt >= LOAD_ATTEMPTS => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "catalog load attempt {}/{} failed: {}",
                    attempt,
                    LOAD_ATTEMPTS,
                    e
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Parse the catalog JSON (an array of entries)
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<CatalogEntry>, CatalogError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    const BULBASAUR: &str = r#"[{"id": 1, "name": "Bulbasaur", "groups": [
        {"variant_id": 0, "images": ["a.png"]},
        {"variant_id": 1, "images": ["b.png", "c.png"]}
    ]}]"#;

    fn local(path: PathBuf) -> CatalogSource {
        CatalogSource::new(AssetLocation::File(path), Client::new(), None)
    }

    #[test]
    fn test_parse_catalog() {
        let entries = parse_catalog(BULBASAUR.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Bulbasaur");
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_catalog(br#"{"id": 1}"#),
            Err(CatalogError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_load_local_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pokemon.json");
        std::fs::write(&path, BULBASAUR).unwrap();

        let source = local(path);
        let entries = source.load_with_retry().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(source.asset_base(), AssetBase::Dir(tmp.path().to_path_buf()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_file_fails_after_retries() {
        let source = local(PathBuf::from("/definitely/not/here.json"));
        let result = source.load_with_retry().await;
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    fn io_error() -> CatalogError {
        CatalogError::Io {
            path: "pokemon.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_all_attempts() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let start = Instant::now();

        let result: Result<(), _> = retry_with_backoff(move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(io_error())
        })
        .await;

        assert!(matches!(result, Err(CatalogError::Io { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), LOAD_ATTEMPTS);
        // 500 ms, then 1000 ms
        let waited = start.elapsed();
        assert!(waited >= RETRY_BASE_DELAY * 3);
        assert!(waited < RETRY_BASE_DELAY * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_at_first_success() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let result = retry_with_backoff(move || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(io_error())
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_errors_are_attempted_once() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let result: Result<Vec<CatalogEntry>, _> = retry_with_backoff(move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            parse_catalog(b"not json")
        })
        .await;

        assert!(matches!(result, Err(CatalogError::Parse(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_not_retried() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        let result = local(path).load_with_retry().await;
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }
}
