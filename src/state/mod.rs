/// State management module
///
/// This module handles all application state, including:
/// - Catalog loading with retries (catalog.rs)
/// - Catalog data structures and display units (data.rs)
/// - Flattening, search and memoized derived lists (units.rs)
/// - The incremental rendering window (pagination.rs)
/// - The shopping-list selection (selection.rs)

pub mod catalog;
pub mod data;
pub mod pagination;
pub mod selection;
pub mod units;
