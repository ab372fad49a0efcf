/// The set of display units marked for export
///
/// Keys are kept independently of the filtered or paginated view, so a unit
/// stays selected while it is hidden by a search.

use std::collections::HashSet;

use super::data::DisplayUnit;

#[derive(Debug, Clone, Default)]
pub struct Selection {
    keys: HashSet<String>,
    /// The clear-confirmation modal is open
    confirming_clear: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the presence of `key`
    pub fn toggle(&mut self, key: &str) {
        if !self.keys.remove(key) {
            self.keys.insert(key.to_string());
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Resolve the selection against the full flattened list.
    ///
    /// Output follows flattened order; keys with no matching unit are skipped.
    pub fn resolve(&self, units: &[DisplayUnit]) -> Vec<DisplayUnit> {
        units
            .iter()
            .filter(|unit| self.keys.contains(&unit.unique_key))
            .cloned()
            .collect()
    }

    /// Empty the set. Used directly after a successful export; the UI path
    /// goes through `request_clear`/`confirm_clear`.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.confirming_clear = false;
    }

    // ========== Clear confirmation ==========

    /// Open the confirmation modal (nothing to confirm on an empty set)
    pub fn request_clear(&mut self) {
        self.confirming_clear = !self.keys.is_empty();
    }

    pub fn is_confirming_clear(&self) -> bool {
        self.confirming_clear
    }

    /// Confirm: the set is emptied. Returns `false` when no confirmation
    /// was pending.
    pub fn confirm_clear(&mut self) -> bool {
        if !self.confirming_clear {
            return false;
        }
        self.clear();
        true
    }

    /// Cancel: no state change besides closing the modal
    pub fn cancel_clear(&mut self) {
        self.confirming_clear = false;
    }
}
