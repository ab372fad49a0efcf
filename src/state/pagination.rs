/// Incremental rendering window over the filtered list
///
/// The window only ever grows while a search term is active. The grid asks
/// for more through a `ProximityDetector` watching the scroll viewport.

/// Cards added per "load more" step
pub const DEFAULT_PAGE_SIZE: usize = 40;

/// Height (in logical pixels) of the sentinel region after the grid
pub const SENTINEL_HEIGHT: f32 = 48.0;

/// First `min(count, len)` elements of `filtered`
pub fn visible<T>(filtered: &[T], count: usize) -> &[T] {
    &filtered[..count.min(filtered.len())]
}

/// The visible-count state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    count: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self { page_size, count: page_size }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Called on every change of the search term
    pub fn reset(&mut self) {
        self.count = self.page_size;
    }

    /// Grow by one page if the list is not exhausted yet.
    /// Returns whether the count changed.
    pub fn load_more(&mut self, filtered_len: usize) -> bool {
        if self.count >= filtered_len {
            return false;
        }
        self.count += self.page_size;
        true
    }

    /// The sentinel is only rendered while there is more to show
    pub fn has_more(&self, filtered_len: usize) -> bool {
        self.count < filtered_len
    }

    /// Number of cards actually rendered
    pub fn rendered(&self, filtered_len: usize) -> usize {
        self.count.min(filtered_len)
    }
}

/// Scroll geometry reported by the grid's scrollable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    /// Distance scrolled from the top
    pub offset_y: f32,
    /// Height of the visible area
    pub viewport_height: f32,
    /// Height of the whole scrolled content (sentinel included)
    pub content_height: f32,
}

impl ViewportMetrics {
    /// The sentinel sits at the very end of the content; it is fully visible
    /// once the bottom of the viewport reaches the end of the content.
    pub fn sentinel_fully_visible(&self) -> bool {
        self.offset_y + self.viewport_height + 0.5 >= self.content_height
    }
}

/// Edge trigger for the "load more" signal.
///
/// Fires at most once per rendered-item set, and is rearmed whenever the
/// number of rendered items changes (the sentinel moved).
#[derive(Debug, Clone, Default)]
pub struct ProximityDetector {
    armed_for: Option<usize>,
    /// Last viewport and the rendered count it was measured with
    last_viewport: Option<(usize, ViewportMetrics)>,
}

impl ProximityDetector {
    /// Feed a new viewport. Returns `true` when "load more" should fire.
    pub fn observe(&mut self, rendered: usize, has_sentinel: bool, viewport: ViewportMetrics) -> bool {
        self.last_viewport = Some((rendered, viewport));
        self.evaluate(rendered, has_sentinel)
    }

    /// Re-check the last known viewport (window resized).
    ///
    /// A viewport measured with a different rendered count no longer
    /// describes the content; the next scroll notification replaces it.
    pub fn recheck(&mut self, rendered: usize, has_sentinel: bool) -> bool {
        self.evaluate(rendered, has_sentinel)
    }

    fn evaluate(&mut self, rendered: usize, has_sentinel: bool) -> bool {
        if !has_sentinel {
            return false;
        }
        let Some((measured_with, viewport)) = self.last_viewport else {
            return false;
        };
        if measured_with != rendered {
            return false;
        }
        if self.armed_for == Some(rendered) || !viewport.sentinel_fully_visible() {
            return false;
        }

        self.armed_for = Some(rendered);
        true
    }

    /// Forget the viewport (the list was replaced and scrolled back to top)
    pub fn reset(&mut self) {
        self.armed_for = None;
        self.last_viewport = None;
    }
}
