//! Image encoding: `PageImage` → PNG bytes every provider accepts.
//!
//! PNG is lossless; JPEG artefacts around glyph edges measurably hurt OCR
//! accuracy. Google Cloud Vision, Azure AI Vision and Amazon Textract all
//! accept PNG, so one encoding serves every backend.

use crate::pipeline::render::PageImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type of every [`EncodedPage`].
pub const PNG_MIME: &str = "image/png";

/// A rasterised page encoded for upload.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Compressed image bytes.
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Encode a rasterised page as PNG, consuming the pixel buffer.
pub fn encode_page(page: PageImage) -> Result<EncodedPage, image::ImageError> {
    let mut buf = Vec::new();
    page.image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    debug!("Encoded page {} → {} bytes PNG", page.page_num, buf.len());

    Ok(EncodedPage {
        page_num: page.page_num,
        bytes: buf,
        mime_type: PNG_MIME,
    })
}
