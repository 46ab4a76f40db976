//! PDF rasterisation: render pages to `DynamicImage` via pdfium, one at a time.
//!
//! [`RasterDocument::pages`] returns a lazy iterator: a page is rendered only
//! when the pipeline asks for it, and the pipeline drops it once it has been
//! encoded. Peak memory therefore stays at one page image no matter how long
//! the document is.
//!
//! Rendering happens on the calling thread. The pipeline is strictly
//! sequential, so there is no other work for the thread to do meanwhile.

use crate::config::{OcrConfig, PageSelection};
use crate::error::PdfOcrError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rasterised page.
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub image: DynamicImage,
}

/// A piece of text drawn with one font size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Font size in points after the text matrix is applied.
    pub size: f32,
}

/// Text layer of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTextLayer {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Text objects in content-stream order.
    pub runs: Vec<TextRun>,
    /// pdfium's plain-text extraction of the whole page.
    pub plain: String,
}

/// Owns the pdfium bindings; opens documents for rendering.
pub struct PdfRasterizer {
    pdfium: Pdfium,
    dpi: u32,
    max_pixels: u32,
}

impl PdfRasterizer {
    /// Bind to pdfium and capture the rendering settings from `config`.
    ///
    /// Lookup order: `PDFIUM_LIB_PATH`, the platform library in the current
    /// directory, then the system library path.
    pub fn new(config: &OcrConfig) -> Result<Self, PdfOcrError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| PdfOcrError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
        })
    }

    /// Load a PDF for rendering.
    ///
    /// pdfium borrows the password for as long as the document is open.
    pub fn open<'a>(
        &'a self,
        pdf_path: &Path,
        password: Option<&'a str>,
    ) -> Result<RasterDocument<'a>, PdfOcrError> {
        let document = self
            .pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        PdfOcrError::WrongPassword {
                            path: pdf_path.to_path_buf(),
                        }
                    } else {
                        PdfOcrError::PasswordRequired {
                            path: pdf_path.to_path_buf(),
                        }
                    }
                } else {
                    PdfOcrError::CorruptPdf {
                        path: pdf_path.to_path_buf(),
                        detail: err_str,
                    }
                }
            })?;

        let page_count = document.pages().len() as usize;
        info!("PDF loaded: {} pages", page_count);

        Ok(RasterDocument {
            document,
            path: pdf_path.to_path_buf(),
            page_count,
            dpi: self.dpi,
            max_pixels: self.max_pixels,
        })
    }
}

/// An opened PDF, ready to be rendered page by page.
pub struct RasterDocument<'a> {
    document: PdfDocument<'a>,
    path: PathBuf,
    page_count: usize,
    dpi: u32,
    max_pixels: u32,
}

impl<'a> RasterDocument<'a> {
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily render the selected pages in ascending page order.
    ///
    /// Every call starts again from the first selected page.
    pub fn pages(&self, selection: &PageSelection) -> Result<PageImages<'_, 'a>, PdfOcrError> {
        let indices = selection.to_indices(self.page_count);
        if indices.is_empty() {
            return Err(PdfOcrError::PageOutOfRange {
                page: 0,
                total: self.page_count,
            });
        }
        Ok(PageImages {
            document: self,
            indices: indices.into_iter(),
        })
    }

    /// Read the text layer of the selected pages, in ascending page order.
    ///
    /// Nothing is rasterised. Each text object keeps its scaled font size.
    pub fn text_layer(&self, selection: &PageSelection) -> Result<Vec<PageTextLayer>, PdfOcrError> {
        let indices = selection.to_indices(self.page_count);
        if indices.is_empty() {
            return Err(PdfOcrError::PageOutOfRange {
                page: 0,
                total: self.page_count,
            });
        }
        indices.into_iter().map(|idx| self.page_text(idx)).collect()
    }

    fn page_text(&self, idx: usize) -> Result<PageTextLayer, PdfOcrError> {
        let failed = |e: PdfiumError| PdfOcrError::TextLayerFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        };
        let page = self.document.pages().get(idx as u16).map_err(failed)?;

        let runs: Vec<TextRun> = page
            .objects()
            .iter()
            .filter_map(|object| {
                object.as_text_object().map(|text| TextRun {
                    text: text.text(),
                    size: text.scaled_font_size().value,
                })
            })
            .filter(|run| !run.text.trim().is_empty())
            .collect();
        let plain = page.text().map_err(failed)?.all();

        debug!("Page {}: {} text runs", idx + 1, runs.len());
        Ok(PageTextLayer {
            page_num: idx + 1,
            runs,
            plain,
        })
    }

    /// Render one page (0-indexed).
    fn render_page(&self, idx: usize) -> Result<PageImage, PdfOcrError> {
        let page = self
            .document
            .pages()
            .get(idx as u16)
            .map_err(|e| PdfOcrError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let target_width = target_width_px(page.width().value, self.dpi, self.max_pixels);
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_maximum_height(self.max_pixels as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PdfOcrError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        Ok(PageImage {
            page_num: idx + 1,
            image,
        })
    }
}

/// Lazy sequence of rendered pages returned by [`RasterDocument::pages`].
pub struct PageImages<'d, 'a> {
    document: &'d RasterDocument<'a>,
    indices: std::vec::IntoIter<usize>,
}

impl Iterator for PageImages<'_, '_> {
    type Item = Result<PageImage, PdfOcrError>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.indices.next()?;
        Some(self.document.render_page(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl ExactSizeIterator for PageImages<'_, '_> {}

/// Pixel width for a page `width_points` wide (1 pt = 1/72 in) at `dpi`,
/// capped at `max_pixels`.
fn target_width_px(width_points: f32, dpi: u32, max_pixels: u32) -> i32 {
    let px = (width_points * dpi as f32 / 72.0).round() as i32;
    px.clamp(1, max_pixels as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_at_200_dpi() {
        // 8.5 in × 72 pt
        assert_eq!(target_width_px(612.0, 200, 4000), 1700);
    }

    #[test]
    fn oversized_page_is_capped() {
        // A0 width, 841 mm ≈ 2384 pt
        assert_eq!(target_width_px(2384.0, 300, 4000), 4000);
    }

    #[test]
    fn degenerate_page_is_at_least_one_pixel() {
        assert_eq!(target_width_px(0.0, 200, 4000), 1);
    }

    #[test]
    fn open_borrows_the_password_from_the_config() {
        let config = OcrConfig::builder()
            .password("secret")
            .build()
            .expect("valid config");
        // Needs a pdfium library on this machine.
        let Ok(rasterizer) = PdfRasterizer::new(&config) else {
            return;
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\nnot really a pdf").expect("write");

        match rasterizer.open(&path, config.password.as_deref()) {
            Ok(_) => panic!("a truncated file must not open"),
            Err(err) => assert!(
                matches!(
                    err,
                    PdfOcrError::CorruptPdf { .. } | PdfOcrError::WrongPassword { .. }
                ),
                "got {err:?}"
            ),
        };
    }
}
