use iced::widget::image::Handle;
use std::collections::HashMap;

/// Load state of one grid image
#[derive(Debug, Clone)]
pub enum Thumbnail {
    Loading,
    Ready(Handle),
    /// Shown as a broken-image placeholder; never retried in this session
    Failed,
}

/// In-memory image handles for the grid, keyed by catalog reference
#[derive(Debug, Default)]
pub struct Thumbnails {
    entries: HashMap<String, Thumbnail>,
}

impl Thumbnails {
    pub fn get(&self, reference: &str) -> Option<&Thumbnail> {
        self.entries.get(reference)
    }

    /// References not requested yet. They are marked `Loading` so each one
    /// is fetched only once.
    pub fn claim_missing<'a, I>(&mut self, references: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut claimed = Vec::new();
        for reference in references {
            if !self.entries.contains_key(reference) {
                self.entries.insert(reference.to_string(), Thumbnail::Loading);
                claimed.push(reference.to_string());
            }
        }
        claimed
    }

    pub fn finish(&mut self, reference: String, result: Result<Handle, String>) {
        let thumbnail = match result {
            Ok(handle) => Thumbnail::Ready(handle),
            Err(e) => {
                tracing::debug!("thumbnail {} failed: {}", reference, e);
                Thumbnail::Failed
            }
        };
        self.entries.insert(reference, thumbnail);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_reference_is_claimed_once() {
        let mut thumbnails = Thumbnails::default();
        assert_eq!(thumbnails.claim_missing(["a.png", "b.png", "a.png"]), vec!["a.png", "b.png"]);
        assert!(thumbnails.claim_missing(["a.png"]).is_empty());
        assert!(matches!(thumbnails.get("a.png"), Some(Thumbnail::Loading)));
    }

    #[test]
    fn test_failures_are_remembered() {
        let mut thumbnails = Thumbnails::default();
        thumbnails.claim_missing(["x.png"]);
        thumbnails.finish("x.png".into(), Err("404".into()));

        assert!(matches!(thumbnails.get("x.png"), Some(Thumbnail::Failed)));
        assert!(thumbnails.claim_missing(["x.png"]).is_empty());
    }
}
