//! Image encoding: BGRA [`PageImage`] → PNG bytes for the OCR engine.
//!
//! pdfium renders BGRA; the `image` crate and tesseract both expect RGBA, so
//! the red and blue channels are swapped before encoding. PNG keeps glyph
//! edges intact, which matters more than file size for recognition.

use crate::error::RecognitionError;
use crate::pipeline::render::{PageImage, BYTES_PER_PIXEL};
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG.
///
/// Fails with [`RecognitionError::InvalidBuffer`] when the buffer length does
/// not match `width * height * 4` or either dimension is zero.
pub fn encode_png(page: &PageImage) -> Result<Vec<u8>, RecognitionError> {
    let expected = page.expected_len();
    if page.width == 0 || page.height == 0 || page.data.len() != expected {
        return Err(RecognitionError::InvalidBuffer {
            width: page.width,
            height: page.height,
            expected,
            actual: page.data.len(),
        });
    }

    let mut rgba = page.data.clone();
    for px in rgba.chunks_exact_mut(BYTES_PER_PIXEL) {
        px.swap(0, 2);
    }

    // Length was checked above, so from_raw cannot fail here.
    let img = RgbaImage::from_raw(page.width, page.height, rgba).ok_or(
        RecognitionError::InvalidBuffer {
            width: page.width,
            height: page.height,
            expected,
            actual: page.data.len(),
        },
    )?;

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    debug!(
        "Encoded page {} ({}x{}) → {} bytes PNG",
        page.page_index + 1,
        page.width,
        page.height,
        buf.len()
    );

    Ok(buf)
}
