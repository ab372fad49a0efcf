/// Floating summary bar and the clear-selection confirmation dialog
use iced::widget::{button, center, column, container, opaque, row, text};
use iced::{Alignment, Color, Element, Length, Theme};

use crate::Message;

/// Count + export + clear. Controls are disabled while generating.
pub fn summary_bar<'a>(count: usize, generating: bool) -> Element<'a, Message> {
    let label = if count == 1 {
        "1 item selected".to_string()
    } else {
        format!("{} items selected", count)
    };

    let export_label = if generating { "Generating…" } else { "Export PDF" };

    let bar = row![
        text(label).size(16),
        button(export_label)
            .on_press_maybe((!generating).then_some(Message::Export))
            .padding(10),
        button("Clear")
            .on_press_maybe((!generating).then_some(Message::RequestClear))
            .style(button::danger)
            .padding(10),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    container(bar)
        .padding(12)
        .style(container::rounded_box)
        .into()
}

/// Modal asking for confirmation before the selection is emptied
pub fn confirm_clear_dialog<'a>(count: usize) -> Element<'a, Message> {
    let dialog = container(
        column![
            text("Clear shopping list?").size(22),
            text(format!("This removes all {} selected items.", count)),
            row![
                button("Cancel")
                    .on_press(Message::CancelClear)
                    .style(button::secondary)
                    .padding(10),
                button("Clear")
                    .on_press(Message::ConfirmClear)
                    .style(button::danger)
                    .padding(10),
            ]
            .spacing(12),
        ]
        .spacing(16),
    )
    .padding(24)
    .width(Length::Fixed(360.0))
    .style(container::rounded_box);

    // dim and block the app underneath
    opaque(
        center(opaque(dialog)).style(|_theme: &Theme| container::Style {
            background: Some(Color { a: 0.6, ..Color::BLACK }.into()),
            ..container::Style::default()
        }),
    )
}
