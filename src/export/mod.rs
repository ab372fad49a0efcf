/// Shopping list export
///
/// This module handles:
/// - Fetching and re-encoding the images of the selected units (images.rs)
/// - Laying out units, images and the footer onto pages (layout.rs)
/// - Serializing the laid-out document to PDF (pdf.rs)
/// - The Idle/Generating export state

pub mod images;
pub mod layout;
pub mod pdf;

use std::path::{Path, PathBuf};

use crate::assets::ImageSource;
use crate::error::ExportError;
use crate::state::data::DisplayUnit;
use images::{prepare_jpeg, EmbeddedImage};
use layout::{Document, DocumentBuilder};

/// Export lifecycle. There is no cancellation: a started export always
/// runs to completion or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Generating,
}

impl ExportState {
    /// Enter `Generating` if idle and there is something to export
    pub fn start(&mut self, selected: usize) -> bool {
        if *self == ExportState::Generating || selected == 0 {
            return false;
        }
        *self = ExportState::Generating;
        true
    }

    pub fn finish(&mut self) {
        *self = ExportState::Idle;
    }

    pub fn is_generating(&self) -> bool {
        *self == ExportState::Generating
    }
}

/// Summary of a finished export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub items: usize,
    pub pages: usize,
    pub missing_images: usize,
}

/// Lay out `units` (already in flattened order) into a document.
///
/// Images are fetched strictly one after another. A failed fetch or decode
/// leaves an empty slot and the assembly carries on.
pub async fn assemble<S>(units: &[DisplayUnit], source: &S, generated_on: &str) -> (Document, usize)
where
    S: ImageSource + ?Sized,
{
    let mut builder = DocumentBuilder::new(generated_on);
    let mut missing = 0;

    for unit in units {
        builder.begin_unit(unit);
        for reference in &unit.images {
            let image = load_image(source, reference).await;
            if image.is_none() {
                missing += 1;
            }
            builder.place_image(image);
        }
        builder.end_unit();
    }

    tracing::debug!("laid out {} units on {} pages", units.len(), builder.page_count());
    (builder.finish(), missing)
}

async fn load_image<S>(source: &S, reference: &str) -> Option<EmbeddedImage>
where
    S: ImageSource + ?Sized,
{
    let bytes = match source.fetch(reference).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("⚠️  Skipping image {}: {}", reference, e);
            return None;
        }
    };

    // Decoding and re-encoding is CPU-bound
    match tokio::task::spawn_blocking(move || prepare_jpeg(&bytes)).await {
        Ok(Ok(image)) => Some(image),
        Ok(Err(e)) => {
            tracing::warn!("⚠️  Could not decode image {}: {}", reference, e);
            None
        }
        Err(e) => {
            tracing::warn!("⚠️  Image task for {} failed: {}", reference, e);
            None
        }
    }
}

/// Assemble the shopping list and write it to `path`.
///
/// Nothing is written when `units` is empty.
pub async fn export_shopping_list<S>(
    units: Vec<DisplayUnit>,
    source: &S,
    path: &Path,
) -> Result<Option<ExportReport>, ExportError>
where
    S: ImageSource + ?Sized,
{
    if units.is_empty() {
        return Ok(None);
    }

    let generated_on = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    let (document, missing_images) = assemble(&units, source, &generated_on).await;
    let bytes = document.to_pdf()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| write_error(path, source))?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| write_error(path, source))?;

    tracing::info!(
        "✅ Exported {} items ({} pages) to {}",
        document.item_count,
        document.pages.len(),
        path.display()
    );

    Ok(Some(ExportReport {
        path: path.to_path_buf(),
        items: document.item_count,
        pages: document.pages.len(),
        missing_images,
    }))
}

fn write_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Write {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::export::images::tests::png_bytes;
    use crate::state::units::{flatten, tests::bulbasaur};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves fixed bytes per reference and records the fetch order
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub(crate) files: HashMap<String, Vec<u8>>,
        pub(crate) fetched: Mutex<Vec<String>>,
    }

    impl FakeSource {
        pub(crate) fn with_pngs(references: &[&str]) -> Self {
            Self {
                files: references
                    .iter()
                    .map(|r| (r.to_string(), png_bytes(8, 8)))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageSource for FakeSource {
        async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
            self.fetched.lock().unwrap().push(reference.to_string());
            self.files
                .get(reference)
                .cloned()
                .ok_or_else(|| FetchError::InvalidReference(reference.to_string()))
        }
    }

    #[test]
    fn test_export_state_machine() {
        let mut state = ExportState::default();
        assert!(!state.start(0));
        assert_eq!(state, ExportState::Idle);

        assert!(state.start(2));
        assert!(state.is_generating());
        assert!(!state.start(2));

        state.finish();
        assert_eq!(state, ExportState::Idle);
    }

    #[tokio::test]
    async fn test_bulbasaur_export_document() {
        let units = flatten(&[bulbasaur()]);
        let source = FakeSource::with_pngs(&["a.png", "b.png", "c.png"]);

        let (doc, missing) = assemble(&units, &source, "today").await;

        assert_eq!(doc.item_count, 2);
        assert_eq!(missing, 0);
        assert_eq!(doc.count_text("Bulbasaur (#1)"), 2);
        assert_eq!(doc.count_text("Variant 1"), 1);
        assert_eq!(doc.texts().filter(|t| t.starts_with("Variant")).count(), 1);
        assert_eq!(doc.count_text("Total items: 2"), 1);
        assert_eq!(doc.images.len(), 3);
    }

    #[tokio::test]
    async fn test_images_fetched_in_listed_order() {
        let units = flatten(&[bulbasaur()]);
        let source = FakeSource::with_pngs(&["a.png", "b.png", "c.png"]);

        assemble(&units, &source, "today").await;
        assert_eq!(*source.fetched.lock().unwrap(), vec!["a.png", "b.png", "c.png"]);
    }

    #[tokio::test]
    async fn test_failed_images_do_not_abort() {
        let units = flatten(&[bulbasaur()]);
        let mut source = FakeSource::with_pngs(&["a.png", "c.png"]);
        source.files.insert("b.png".into(), b"corrupt".to_vec());

        let (doc, missing) = assemble(&units, &source, "today").await;
        assert_eq!(missing, 1);
        assert_eq!(doc.images.len(), 2);
        assert_eq!(doc.item_count, 2);
    }

    #[tokio::test]
    async fn test_export_writes_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("pokemon-shopping-list.pdf");
        let source = FakeSource::with_pngs(&["a.png"]);

        let report = export_shopping_list(flatten(&[bulbasaur()]), &source, &path)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.items, 2);
        assert_eq!(report.missing_images, 2);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_empty_export_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pokemon-shopping-list.pdf");
        let source = FakeSource::default();

        let report = export_shopping_list(Vec::new(), &source, &path).await.unwrap();
        assert!(report.is_none());
        assert!(!path.exists());
        assert!(source.fetched.lock().unwrap().is_empty());
    }
}
