/// Asset access for the catalog and its images
///
/// This module handles:
/// - Resolving image references against the catalog location
/// - Fetching bytes from disk or over HTTP
/// - The bounded on-disk cache that keeps the app usable offline

pub mod cache;
pub mod source;

pub use cache::AssetCache;
pub use source::{AssetBase, AssetFetcher, AssetLocation, ImageSource};
