/// PDF serialization of a laid-out `Document`
///
/// # Coordinate System
///
/// The layout uses a top-left origin with `y` growing downwards; PDF uses a
/// bottom-left origin. Every `y` is converted with
/// ```text
/// pdf_y = PAGE_HEIGHT - layout_y
/// ```
/// Boxes (images, placeholders) additionally subtract their height, since
/// PDF places them by their lower-left corner.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};

use super::layout::{Document, DrawOp, PAGE_HEIGHT, PAGE_WIDTH, TITLE};
use crate::error::ExportError;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

/// Grey level of separators and empty image slots
const RULE_GREY: f32 = 0.8;

impl Document {
    /// Serialize into PDF bytes
    pub fn to_pdf(&self) -> Result<Vec<u8>, ExportError> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(standard_font("Helvetica"));
        let bold_id = doc.add_object(standard_font("Helvetica-Bold"));

        let mut xobjects = Dictionary::new();
        for (index, image) in self.images.iter().enumerate() {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                image.jpeg.clone(),
            );
            let image_id = doc.add_object(stream);
            xobjects.set(image_name(index), image_id);
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT => regular_id,
                BOLD_FONT => bold_id,
            },
            "XObject" => xobjects,
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let operations: Vec<Operation> = page.ops.iter().flat_map(operations_for).collect();
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
            let page_id = add_page(&mut doc, pages_id, content_id, resources_id);
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(encode_win_ansi(TITLE), StringFormat::Literal),
            "Producer" => Object::string_literal("pokedex-cart"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| ExportError::Serialize(e.to_string()))?;
        Ok(output)
    }
}

fn standard_font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_page(
    doc: &mut lopdf::Document,
    pages_id: ObjectId,
    content_id: ObjectId,
    resources_id: ObjectId,
) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    })
}

fn image_name(index: usize) -> String {
    format!("Im{}", index)
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn operations_for(op: &DrawOp) -> Vec<Operation> {
    match op {
        DrawOp::Text { x, y, size, bold, text } => {
            let font = if *bold { BOLD_FONT } else { REGULAR_FONT };
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![name(font), (*size).into()]),
                Operation::new("Td", vec![(*x).into(), (PAGE_HEIGHT - y).into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]
        }
        DrawOp::Line { x1, x2, y } => {
            let pdf_y = PAGE_HEIGHT - y;
            vec![
                Operation::new("q", vec![]),
                Operation::new("G", vec![RULE_GREY.into()]),
                Operation::new("w", vec![0.5.into()]),
                Operation::new("m", vec![(*x1).into(), pdf_y.into()]),
                Operation::new("l", vec![(*x2).into(), pdf_y.into()]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ]
        }
        DrawOp::Image { index, x, y, width, height } => vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (*width).into(),
                    0.into(),
                    0.into(),
                    (*height).into(),
                    (*x).into(),
                    (PAGE_HEIGHT - y - height).into(),
                ],
            ),
            Operation::new("Do", vec![name(&image_name(*index))]),
            Operation::new("Q", vec![]),
        ],
        DrawOp::Placeholder { x, y, size } => vec![
            Operation::new("q", vec![]),
            Operation::new("G", vec![RULE_GREY.into()]),
            Operation::new("w", vec![0.5.into()]),
            Operation::new(
                "re",
                vec![
                    (*x).into(),
                    (PAGE_HEIGHT - y - size).into(),
                    (*size).into(),
                    (*size).into(),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}

/// Encode text for the standard fonts' WinAnsiEncoding.
///
/// Latin-1 maps onto itself; a few common typographic characters have their
/// own code points; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::images::EmbeddedImage;
    use crate::export::layout::{DocumentBuilder, Page};
    use crate::state::data::DisplayUnit;

    fn shown_strings(bytes: &[u8]) -> (usize, Vec<Vec<u8>>) {
        let pdf = lopdf::Document::load_mem(bytes).unwrap();
        let pages = pdf.get_pages();
        let mut strings = Vec::new();
        for (_, page_id) in &pages {
            let content = Content::decode(&pdf.get_page_content(*page_id).unwrap()).unwrap();
            for op in content.operations {
                if op.operator == "Tj" {
                    if let Some(Object::String(s, _)) = op.operands.first() {
                        strings.push(s.clone());
                    }
                }
            }
        }
        (pages.len(), strings)
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Pokémon"), b"Pok\xE9mon".to_vec());
        assert_eq!(encode_win_ansi("a–b"), vec![b'a', 0x96, b'b']);
        assert_eq!(encode_win_ansi("ポ"), b"?".to_vec());
    }

    #[test]
    fn test_pdf_round_trips_through_lopdf() {
        let unit = DisplayUnit {
            unique_key: "1-1".into(),
            id: 1,
            name: "Bulbasaur".into(),
            variant_id: 1,
            images: vec!["b.png".into()],
        };
        let mut builder = DocumentBuilder::new("2026-01-01");
        builder.begin_unit(&unit);
        builder.place_image(None);
        builder.end_unit();
        let bytes = builder.finish().to_pdf().unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let (pages, strings) = shown_strings(&bytes);
        assert_eq!(pages, 1);
        assert!(strings.contains(&b"Bulbasaur (#1)".to_vec()));
        assert!(strings.contains(&b"Variant 1".to_vec()));
        assert!(strings.contains(&b"Total items: 1".to_vec()));
    }

    #[test]
    fn test_images_become_xobjects() {
        let jpeg = crate::export::images::prepare_jpeg(&crate::export::images::tests::png_bytes(4, 4))
            .unwrap();
        let doc = Document {
            pages: vec![Page {
                ops: vec![DrawOp::Image { index: 0, x: 10.0, y: 10.0, width: 40.0, height: 40.0 }],
            }],
            images: vec![EmbeddedImage { width: 4, height: 4, jpeg: jpeg.jpeg }],
            item_count: 0,
        };

        let bytes = doc.to_pdf().unwrap();
        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        let has_image = pdf.objects.values().any(|obj| match obj {
            Object::Stream(stream) => stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|subtype| subtype == b"Image")
                .unwrap_or(false),
            _ => false,
        });
        assert!(has_image);
    }
}
