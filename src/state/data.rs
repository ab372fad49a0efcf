/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the catalog loader, the derived views and the UI/export layers.

use serde::{Deserialize, Deserializer, Serialize};

/// One logical product in the catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    /// Absent or `null` in the file means "no variants"
    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<VariantGroup>,
}

/// A sub-variant (size, form, ...) of a catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantGroup {
    /// 0 means "no variant"
    pub variant_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
}

/// One flattened, independently selectable (entry, variant) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayUnit {
    /// `"{id}-{variant_id}"`
    pub unique_key: String,
    pub id: i64,
    pub name: String,
    pub variant_id: i64,
    pub images: Vec<String>,
}

impl DisplayUnit {
    pub fn new(entry: &CatalogEntry, group: &VariantGroup) -> Self {
        Self {
            unique_key: unit_key(entry.id, group.variant_id),
            id: entry.id,
            name: entry.name.clone(),
            variant_id: group.variant_id,
            images: group.images.clone(),
        }
    }

    pub fn has_variant(&self) -> bool {
        self.variant_id > 0
    }

    /// Heading used on cards and in the exported list
    pub fn title(&self) -> String {
        format!("{} (#{})", self.name, self.id)
    }
}

/// Build the unique key of an (entry, variant) pair
pub fn unit_key(id: i64, variant_id: i64) -> String {
    format!("{}-{}", id, variant_id)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
