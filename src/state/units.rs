/// Flattening and filtering of the catalog into display units
///
/// `flatten` and `filter` are pure functions. `CatalogView` memoizes them so
/// the UI only re-derives a list when the snapshot it was built from changes.

use std::sync::Arc;

use super::data::{CatalogEntry, DisplayUnit};

/// Convert nested catalog entries into flat display units.
///
/// Order is catalog order, then group order within each entry.
/// Entries without groups contribute nothing.
pub fn flatten(entries: &[CatalogEntry]) -> Vec<DisplayUnit> {
    entries
        .iter()
        .flat_map(|entry| {
            entry
                .groups
                .iter()
                .map(move |group| DisplayUnit::new(entry, group))
        })
        .collect()
}

/// Trim and lowercase a raw search term
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Does `unit` match an already normalized term?
pub fn matches(unit: &DisplayUnit, normalized: &str) -> bool {
    unit.name.to_lowercase().contains(normalized) || unit.id.to_string().contains(normalized)
}

/// Keep the units whose name (case-insensitive) or id contains `term`.
///
/// An empty term after normalization returns every unit.
pub fn filter(units: &[DisplayUnit], term: &str) -> Vec<DisplayUnit> {
    let normalized = normalize_term(term);
    if normalized.is_empty() {
        return units.to_vec();
    }

    units
        .iter()
        .filter(|unit| matches(unit, &normalized))
        .cloned()
        .collect()
}

/// Memoized derived lists over one catalog snapshot
#[derive(Debug, Clone)]
pub struct CatalogView {
    catalog: Arc<[CatalogEntry]>,
    units: Arc<[DisplayUnit]>,
    /// Raw term as typed
    term: String,
    /// Normalized term the `filtered` list was computed for
    filtered_for: String,
    filtered: Arc<[DisplayUnit]>,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self::new(Arc::from(Vec::new()))
    }
}

impl CatalogView {
    pub fn new(catalog: Arc<[CatalogEntry]>) -> Self {
        let units: Arc<[DisplayUnit]> = flatten(&catalog).into();
        Self {
            catalog,
            filtered: Arc::clone(&units),
            units,
            term: String::new(),
            filtered_for: String::new(),
        }
    }

    /// Replace the catalog snapshot.
    ///
    /// Returns `false` (and keeps every cached list) when the same snapshot
    /// is passed again.
    pub fn set_catalog(&mut self, catalog: Arc<[CatalogEntry]>) -> bool {
        if Arc::ptr_eq(&self.catalog, &catalog) {
            return false;
        }

        self.units = flatten(&catalog).into();
        self.catalog = catalog;
        self.refilter();
        true
    }

    /// Update the search term.
    ///
    /// Returns `true` when the raw term changed (the caller resets
    /// pagination on that edge).
    pub fn set_term(&mut self, term: &str) -> bool {
        if self.term == term {
            return false;
        }

        self.term = term.to_string();
        if normalize_term(term) != self.filtered_for {
            self.refilter();
        }
        true
    }

    fn refilter(&mut self) {
        let normalized = normalize_term(&self.term);
        self.filtered = if normalized.is_empty() {
            Arc::clone(&self.units)
        } else {
            filter(&self.units, &normalized).into()
        };
        self.filtered_for = normalized;
    }

    pub fn catalog(&self) -> &Arc<[CatalogEntry]> {
        &self.catalog
    }

    /// Every unit of the snapshot, unfiltered
    pub fn units(&self) -> &Arc<[DisplayUnit]> {
        &self.units
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Units matching the current term
    pub fn filtered(&self) -> &Arc<[DisplayUnit]> {
        &self.filtered
    }
}
