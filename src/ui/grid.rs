/// Responsive card grid
/// Cards are laid out in 2–5 columns depending on the window width.
use iced::widget::{column, container, image, mouse_area, text, Column, Row, Space};
use iced::{Border, Color, Element, Length, Theme};
use iced_aw::Wrap;

use super::thumbnails::{Thumbnail, Thumbnails};
use crate::state::data::DisplayUnit;
use crate::state::pagination::SENTINEL_HEIGHT;
use crate::state::selection::Selection;
use crate::Message;

const CARD_SPACING: f32 = 12.0;
const THUMB_SIZE: f32 = 96.0;

/// Number of grid columns for a window width in logical pixels
pub fn columns_for_width(width: f32) -> usize {
    match width {
        w if w < 640.0 => 2,
        w if w < 960.0 => 3,
        w if w < 1280.0 => 4,
        _ => 5,
    }
}

/// Everything the grid needs to render one frame
pub struct GridView<'a> {
    pub units: &'a [DisplayUnit],
    pub columns: usize,
    pub selection: &'a Selection,
    pub thumbnails: &'a Thumbnails,
    /// Cards ignore clicks while an export is running
    pub interactive: bool,
    /// Render the "load more" sentinel after the cards
    pub has_more: bool,
}

impl<'a> GridView<'a> {
    pub fn view(self) -> Element<'a, Message> {
        let columns = self.columns.max(1);
        let mut grid = Column::new().spacing(CARD_SPACING).padding(16);

        for chunk in self.units.chunks(columns) {
            let mut line = Row::new().spacing(CARD_SPACING);
            for unit in chunk {
                line = line.push(self.card(unit));
            }
            // keep card widths equal on the last, shorter row
            for _ in chunk.len()..columns {
                line = line.push(Space::with_width(Length::FillPortion(1)));
            }
            grid = grid.push(line);
        }

        if self.has_more {
            grid = grid.push(
                container(text("Loading more…").size(14))
                    .center_x(Length::Fill)
                    .height(Length::Fixed(SENTINEL_HEIGHT)),
            );
        }

        if self.units.is_empty() {
            grid = grid.push(container(text("No Pokémon match your search.")).center_x(Length::Fill));
        }

        grid.into()
    }

    fn card(&self, unit: &'a DisplayUnit) -> Element<'a, Message> {
        let selected = self.selection.is_selected(&unit.unique_key);

        let images: Vec<Element<'a, Message>> = unit
            .images
            .iter()
            .map(|reference| self.thumbnail(reference))
            .collect();

        let mut details = column![
            Wrap::with_elements(images).spacing(4.0).line_spacing(4.0),
            text(unit.title()).size(16),
        ]
        .spacing(6);

        if unit.has_variant() {
            details = details.push(text(format!("Variant {}", unit.variant_id)).size(12));
        }
        if selected {
            details = details.push(text("✓ In shopping list").size(12));
        }

        let card = container(details)
            .padding(10)
            .width(Length::FillPortion(1))
            .style(move |theme: &Theme| card_style(theme, selected));

        let area = mouse_area(card);
        if self.interactive {
            area.on_press(Message::ToggleSelection(unit.unique_key.clone())).into()
        } else {
            area.into()
        }
    }

    fn thumbnail(&self, reference: &str) -> Element<'a, Message> {
        match self.thumbnails.get(reference) {
            Some(Thumbnail::Ready(handle)) => image(handle.clone())
                .width(Length::Fixed(THUMB_SIZE))
                .height(Length::Fixed(THUMB_SIZE))
                .into(),
            Some(Thumbnail::Failed) => placeholder("⚠"),
            _ => placeholder("…"),
        }
    }
}

fn placeholder<'a>(label: &'a str) -> Element<'a, Message> {
    container(text(label).size(20))
        .center_x(Length::Fixed(THUMB_SIZE))
        .center_y(Length::Fixed(THUMB_SIZE))
        .style(container::bordered_box)
        .into()
}

fn card_style(theme: &Theme, selected: bool) -> container::Style {
    let palette = theme.extended_palette();
    let border_color = if selected {
        palette.primary.strong.color
    } else {
        Color { a: 0.2, ..palette.background.strong.color }
    };

    container::Style {
        border: Border {
            color: border_color,
            width: if selected { 3.0 } else { 1.0 },
            radius: 8.0.into(),
        },
        ..container::rounded_box(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_breakpoints() {
        assert_eq!(columns_for_width(400.0), 2);
        assert_eq!(columns_for_width(640.0), 3);
        assert_eq!(columns_for_width(1000.0), 4);
        assert_eq!(columns_for_width(1280.0), 5);
        assert_eq!(columns_for_width(3840.0), 5);
    }
}
