use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use crate::error::DecodeError;

/// Largest edge of an embedded image, in pixels
const EMBED_MAX_SIZE: u32 = 256;

/// A baseline JPEG ready to be embedded with DCTDecode
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Decode any supported format, flatten transparency onto white, shrink
/// to the embed size and re-encode as RGB JPEG
pub fn prepare_jpeg(bytes: &[u8]) -> Result<EmbeddedImage, DecodeError> {
    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::Empty);
    }

    let img = if img.width() > EMBED_MAX_SIZE || img.height() > EMBED_MAX_SIZE {
        img.resize(EMBED_MAX_SIZE, EMBED_MAX_SIZE, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = flatten_on_white(&img);
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(rgb).write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;

    Ok(EmbeddedImage { width, height, jpeg })
}

/// Composite straight alpha over a white background
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
