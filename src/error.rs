/// Error types for every fallible concern in the application
///
/// Each concern gets its own enum so callers can tell a catalog failure
/// (fatal to browsing) from an image failure (never fatal).

use thiserror::Error;

/// Failures while loading the catalog file
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch catalog: {0}")]
    Fetch(#[from] FetchError),

    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures while fetching a single asset (image or remote catalog)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid asset reference {0:?}")]
    InvalidReference(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

/// Failures while turning fetched bytes into an embeddable JPEG
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image could not be decoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("image has zero size")]
    Empty,
}

/// Failures that abort an export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode PDF content: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to serialize PDF: {0}")]
    Serialize(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk asset cache failures (always logged, never surfaced)
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),
}
