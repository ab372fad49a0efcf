/// Resolution and fetching of catalog assets
///
/// Image references in the catalog are either absolute URLs or paths
/// relative to the catalog file. The fetcher reads local files directly and
/// goes through the offline cache for anything remote.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};

use super::cache::AssetCache;
use crate::error::FetchError;

/// Where relative references are resolved from
#[derive(Debug, Clone, PartialEq)]
pub enum AssetBase {
    /// Directory containing a local catalog file
    Dir(PathBuf),
    /// URL of a remote catalog file
    Url(Url),
}

/// A fully resolved asset
#[derive(Debug, Clone, PartialEq)]
pub enum AssetLocation {
    File(PathBuf),
    Remote(Url),
}

impl AssetLocation {
    /// Resolve the catalog location itself (path, file:// or http(s) URL)
    pub fn parse_catalog(location: &str) -> Result<Self, FetchError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(FetchError::InvalidReference(location.to_string()));
        }

        match parse_absolute_url(location) {
            Some(url) => url_to_location(url, location),
            None => Ok(AssetLocation::File(PathBuf::from(location))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AssetLocation::File(path) => path.display().to_string(),
            AssetLocation::Remote(url) => url.to_string(),
        }
    }
}

impl AssetBase {
    /// Base for references found in the catalog at `catalog`
    pub fn for_catalog(catalog: &AssetLocation) -> Self {
        match catalog {
            AssetLocation::File(path) => AssetBase::Dir(
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            ),
            AssetLocation::Remote(url) => AssetBase::Url(url.clone()),
        }
    }

    /// Resolve one reference from the catalog.
    ///
    /// Against a directory base a leading `/` means the catalog directory
    /// root; against a URL base the usual URL join rules apply.
    pub fn resolve(&self, reference: &str) -> Result<AssetLocation, FetchError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(FetchError::InvalidReference(reference.to_string()));
        }

        if let Some(url) = parse_absolute_url(reference) {
            return url_to_location(url, reference);
        }

        match self {
            AssetBase::Dir(dir) => {
                let relative = reference.trim_start_matches("./").trim_start_matches('/');
                Ok(AssetLocation::File(dir.join(relative)))
            }
            AssetBase::Url(base) => base
                .join(reference)
                .map(AssetLocation::Remote)
                .map_err(|_| FetchError::InvalidReference(reference.to_string())),
        }
    }
}

/// Only schemes we can fetch count as absolute; anything else is a path
fn parse_absolute_url(reference: &str) -> Option<Url> {
    let url = Url::parse(reference).ok()?;
    match url.scheme() {
        "http" | "https" | "file" => Some(url),
        _ => None,
    }
}

fn url_to_location(url: Url, reference: &str) -> Result<AssetLocation, FetchError> {
    if url.scheme() == "file" {
        url.to_file_path()
            .map(AssetLocation::File)
            .map_err(|_| FetchError::InvalidReference(reference.to_string()))
    } else {
        Ok(AssetLocation::Remote(url))
    }
}

/// Anything that can turn an image reference into bytes
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches assets relative to one catalog, through the offline cache
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    base: AssetBase,
    client: Client,
    cache: Option<AssetCache>,
}

impl AssetFetcher {
    pub fn new(base: AssetBase, client: Client, cache: Option<AssetCache>) -> Self {
        Self { base, client, cache }
    }

    pub async fn fetch_location(&self, location: &AssetLocation) -> Result<Vec<u8>, FetchError> {
        match location {
            AssetLocation::File(path) => read_file(path).await,
            AssetLocation::Remote(url) => {
                fetch_remote_cached(&self.client, self.cache.as_ref(), url).await
            }
        }
    }
}

#[async_trait]
impl ImageSource for AssetFetcher {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        let location = self.base.resolve(reference)?;
        self.fetch_location(&location).await
    }
}

pub(crate) async fn read_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    tokio::fs::read(path).await.map_err(|source| FetchError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Stale-while-revalidate: a cached copy is returned at once and refreshed
/// in the background; a miss goes to the network and fills the cache.
pub(crate) async fn fetch_remote_cached(
    client: &Client,
    cache: Option<&AssetCache>,
    url: &Url,
) -> Result<Vec<u8>, FetchError> {
    let key = url.as_str();

    if let Some(cache) = cache {
        if let Some(bytes) = cache.get(key).await {
            // Serve the cached copy now and revalidate it in the background
            let client = client.clone();
            let cache = cache.clone();
            let url = url.clone();
            tokio::spawn(async move {
                match fetch_remote(&client, &url).await {
                    Ok(fresh) => {
                        if let Err(e) = cache.put(url.as_str(), &fresh).await {
                            tracing::debug!("failed to refresh cache for {}: {}", url, e);
                        }
                    }
                    Err(e) => tracing::debug!("revalidation of {} failed: {}", url, e),
                }
            });
            return Ok(bytes);
        }
    }

    // Cache miss: go to the network and remember the result
    let bytes = fetch_remote(client, url).await?;
    if let Some(cache) = cache {
        if let Err(e) = cache.put(key, &bytes).await {
            tracing::warn!("failed to cache {}: {}", url, e);
        }
    }
    Ok(bytes)
}

async fn fetch_remote(client: &Client, url: &Url) -> Result<Vec<u8>, FetchError> {
    let http_error = |source| FetchError::Http { url: url.to_string(), source };

    let response = client.get(url.clone()).send().await.map_err(http_error)?;

    // Anything but 2xx is a failed fetch
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(http_error)?;
    Ok(bytes.to_vec())
}
