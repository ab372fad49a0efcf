/// Page layout of the shopping list
///
/// All coordinates are PDF points with the origin at the top-left corner of
/// the page and `y` growing downwards. The PDF writer flips them to the
/// bottom-left origin. Text `y` is the baseline, box `y` is the top edge.

use super::images::EmbeddedImage;
use crate::state::data::DisplayUnit;

// ========== Page geometry (A4 portrait) ==========

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 40.0;

/// Lowest `y` content may reach
pub const CONTENT_BOTTOM: f32 = PAGE_HEIGHT - MARGIN;
/// Right edge images may not cross
pub const CONTENT_RIGHT: f32 = PAGE_WIDTH - MARGIN;

// ========== Title block ==========

pub const TITLE: &str = "Pokémon Shopping List";
const TITLE_SIZE: f32 = 20.0;
const SUBTITLE_SIZE: f32 = 10.0;
/// Cursor position below the title block on page 1
pub const CONTENT_START: f32 = MARGIN + 60.0;

// ========== Unit blocks ==========

pub const TAG_LINE: &str = "Pokémon plush";
const NAME_SIZE: f32 = 13.0;
const DETAIL_SIZE: f32 = 10.0;

/// Horizontal start of the image row, right of the text column
pub const IMAGE_X: f32 = 200.0;
pub const IMAGE_SIZE: f32 = 80.0;
pub const IMAGE_GAP: f32 = 10.0;
pub const ROW_HEIGHT: f32 = IMAGE_SIZE + IMAGE_GAP;

/// Vertical advance after a unit (one image row plus separator spacing)
pub const BLOCK_HEIGHT: f32 = IMAGE_SIZE + 20.0;
/// Room needed to start a unit: text lines beside one image row
pub const MIN_BLOCK_HEIGHT: f32 = BLOCK_HEIGHT;
const SEPARATOR_OFFSET: f32 = 10.0;

// ========== Footer ==========

const FOOTER_SIZE: f32 = 12.0;
pub const FOOTER_HEIGHT: f32 = 30.0;
const PAGE_LABEL_SIZE: f32 = 8.0;

/// One drawing instruction
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    /// Grey horizontal rule
    Line { x1: f32, x2: f32, y: f32 },
    /// A fetched image, drawn inside its square footprint
    Image {
        index: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Empty slot where an image failed to load
    Placeholder { x: f32, y: f32, size: f32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

/// The laid-out shopping list, ready for the PDF writer
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
    pub images: Vec<EmbeddedImage>,
    pub item_count: usize,
}

#[cfg(test)]
impl Document {
    /// Every text run, in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|page| {
            page.ops.iter().filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
        })
    }

    pub fn count_text(&self, needle: &str) -> usize {
        self.texts().filter(|text| *text == needle).count()
    }
}

/// Incremental layout: units and their images are fed one at a time, so
/// images can be fetched between calls.
#[derive(Debug)]
pub struct DocumentBuilder {
    pages: Vec<Page>,
    images: Vec<EmbeddedImage>,
    y: f32,
    image_x: f32,
    row_top: f32,
    item_count: usize,
}

impl DocumentBuilder {
    /// Start page 1 with the title block
    pub fn new(generated_on: &str) -> Self {
        let mut builder = Self {
            pages: vec![Page::default()],
            images: Vec::new(),
            y: CONTENT_START,
            image_x: IMAGE_X,
            row_top: CONTENT_START,
            item_count: 0,
        };

        builder.text(MARGIN, MARGIN + 20.0, TITLE_SIZE, true, TITLE);
        builder.text(
            MARGIN,
            MARGIN + 38.0,
            SUBTITLE_SIZE,
            false,
            &format!("Generated {}", generated_on),
        );
        builder
    }

    fn current(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text(&mut self, x: f32, y: f32, size: f32, bold: bool, text: &str) {
        self.current().ops.push(DrawOp::Text {
            x,
            y,
            size,
            bold,
            text: text.to_string(),
        });
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Emit the text block of a unit, breaking the page first if the block
    /// would not fit
    pub fn begin_unit(&mut self, unit: &DisplayUnit) {
        if CONTENT_BOTTOM - self.y < MIN_BLOCK_HEIGHT {
            self.new_page();
        }

        let top = self.y;
        self.text(MARGIN, top + NAME_SIZE, NAME_SIZE, true, &unit.title());
        self.text(MARGIN, top + 28.0, DETAIL_SIZE, false, TAG_LINE);
        if unit.has_variant() {
            self.text(
                MARGIN,
                top + 42.0,
                DETAIL_SIZE,
                false,
                &format!("Variant {}", unit.variant_id),
            );
        }

        self.image_x = IMAGE_X;
        self.row_top = top;
    }

    /// Place the next image of the current unit; `None` leaves an empty slot.
    ///
    /// Rows wrap at the right margin. A wrapped row that would cross the
    /// bottom margin moves to the top of a new page.
    pub fn place_image(&mut self, image: Option<EmbeddedImage>) {
        if self.image_x + IMAGE_SIZE > CONTENT_RIGHT {
            self.image_x = IMAGE_X;
            self.row_top += ROW_HEIGHT;
            if self.row_top + BLOCK_HEIGHT > CONTENT_BOTTOM {
                self.new_page();
                self.row_top = MARGIN;
            }
        }

        let (x, y) = (self.image_x, self.row_top);
        let op = match image {
            Some(image) => {
                let scale = IMAGE_SIZE / image.width.max(image.height) as f32;
                let width = image.width as f32 * scale;
                let height = image.height as f32 * scale;
                let index = self.images.len();
                self.images.push(image);
                DrawOp::Image {
                    index,
                    x: x + (IMAGE_SIZE - width) / 2.0,
                    y: y + (IMAGE_SIZE - height) / 2.0,
                    width,
                    height,
                }
            }
            None => DrawOp::Placeholder { x, y, size: IMAGE_SIZE },
        };
        self.current().ops.push(op);
        self.image_x += IMAGE_SIZE + IMAGE_GAP;
    }

    /// Close the unit: advance past its last image row and draw a separator
    pub fn end_unit(&mut self) {
        self.y = self.row_top + BLOCK_HEIGHT;
        let y = self.y - SEPARATOR_OFFSET;
        self.current().ops.push(DrawOp::Line { x1: MARGIN, x2: CONTENT_RIGHT, y });
        self.item_count += 1;
    }

    /// Append the total-count footer (on a fresh page if it does not fit)
    /// and label the pages
    pub fn finish(mut self) -> Document {
        if self.y + FOOTER_HEIGHT > CONTENT_BOTTOM {
            self.new_page();
        }
        let footer = format!("Total items: {}", self.item_count);
        self.text(MARGIN, self.y + 20.0, FOOTER_SIZE, true, &footer);

        let total = self.pages.len();
        if total > 1 {
            for (i, page) in self.pages.iter_mut().enumerate() {
                page.ops.push(DrawOp::Text {
                    x: PAGE_WIDTH - MARGIN - 40.0,
                    y: PAGE_HEIGHT - 20.0,
                    size: PAGE_LABEL_SIZE,
                    bold: false,
                    text: format!("Page {} / {}", i + 1, total),
                });
            }
        }

        Document {
            pages: self.pages,
            images: self.images,
            item_count: self.item_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: i64, variant_id: i64, images: usize) -> DisplayUnit {
        DisplayUnit {
            unique_key: format!("{}-{}", id, variant_id),
            id,
            name: format!("Mon{}", id),
            variant_id,
            images: (0..images).map(|i| format!("{}.png", i)).collect(),
        }
    }

    fn square() -> Option<EmbeddedImage> {
        Some(EmbeddedImage { width: 10, height: 10, jpeg: vec![0xFF, 0xD8] })
    }

    fn lay_out(units: &[DisplayUnit]) -> Document {
        let mut builder = DocumentBuilder::new("today");
        for unit in units {
            builder.begin_unit(unit);
            for _ in &unit.images {
                builder.place_image(square());
            }
            builder.end_unit();
        }
        builder.finish()
    }

    fn assert_within_bounds(doc: &Document) {
        for page in &doc.pages {
            for op in &page.ops {
                match op {
                    DrawOp::Image { x, y, width, height, .. } => {
                        assert!(x + width <= CONTENT_RIGHT + 0.01);
                        assert!(y + height <= CONTENT_BOTTOM + 0.01, "image at {}", y);
                    }
                    DrawOp::Placeholder { x, y, size } => {
                        assert!(x + size <= CONTENT_RIGHT + 0.01);
                        assert!(y + size <= CONTENT_BOTTOM + 0.01);
                    }
                    DrawOp::Line { y, .. } => assert!(*y <= CONTENT_BOTTOM),
                    DrawOp::Text { .. } => {}
                }
            }
        }
    }

    #[test]
    fn test_variant_line_only_for_variants() {
        let doc = lay_out(&[unit(1, 0, 1), unit(1, 2, 1)]);
        assert_eq!(doc.count_text("Mon1 (#1)"), 2);
        assert_eq!(doc.count_text("Variant 2"), 1);
        assert_eq!(doc.texts().filter(|t| t.starts_with("Variant")).count(), 1);
        assert_eq!(doc.count_text("Total items: 2"), 1);
    }

    #[test]
    fn test_images_wrap_at_right_margin() {
        let doc = lay_out(&[unit(7, 0, 5)]);
        let positions: Vec<(f32, f32)> = doc.pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect();

        assert_eq!(positions.len(), 5);
        assert_eq!(positions[4].0, IMAGE_X);
        assert_eq!(positions[4].1, positions[0].1 + ROW_HEIGHT);
        assert_within_bounds(&doc);
    }

    #[test]
    fn test_units_break_onto_new_pages() {
        let units: Vec<_> = (1..=20).map(|id| unit(id, 0, 1)).collect();
        let doc = lay_out(&units);

        assert!(doc.pages.len() > 1);
        assert_within_bounds(&doc);
        assert_eq!(doc.count_text("Page 1 / 3"), 1);
        assert_eq!(doc.item_count, 20);
    }

    #[test]
    fn test_many_images_never_cross_bottom_margin() {
        let doc = lay_out(&[unit(1, 0, 3), unit(2, 0, 60)]);
        assert!(doc.pages.len() >= 2);
        assert_within_bounds(&doc);
    }

    #[test]
    fn test_failed_images_leave_placeholders() {
        let mut builder = DocumentBuilder::new("today");
        builder.begin_unit(&unit(1, 0, 2));
        builder.place_image(None);
        builder.place_image(square());
        builder.end_unit();
        let doc = builder.finish();

        let placeholders = doc.pages[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Placeholder { .. }))
            .count();
        assert_eq!(placeholders, 1);
        assert_eq!(doc.images.len(), 1);
    }

    #[test]
    fn test_footer_stays_on_page_with_room() {
        let units: Vec<_> = (1..=6).map(|id| unit(id, 0, 0)).collect();
        let doc = lay_out(&units);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.count_text("Total items: 6"), 1);
    }

    #[test]
    fn test_footer_moves_to_new_page_when_full() {
        // seven text-only blocks fill page 1 down to the bottom margin
        let units: Vec<_> = (1..=7).map(|id| unit(id, 0, 0)).collect();
        let doc = lay_out(&units);

        assert_eq!(doc.pages.len(), 2);
        let last: Vec<_> = doc.pages[1]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(last, vec!["Total items: 7", "Page 2 / 2"]);
    }
}
