//! Recognition loop: drive every page through encode → OCR, in page order.
//!
//! Pages are pulled from the (lazy) page sequence one at a time. The rendered
//! image is consumed by the encoder and the encoded bytes are dropped once the
//! provider has answered, so at most one page is held in memory.

use crate::config::{FailurePolicy, OcrConfig, PageSeparator};
use crate::error::PdfOcrError;
use crate::output::{OcrOutput, OcrStats, PageResult};
use crate::pipeline::encode::encode_page;
use crate::pipeline::render::PageImage;
use crate::providers::OcrProvider;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Recognise a sequence of page images with `provider`.
///
/// `pages` yields pages in ascending page order; rasterisation errors may be
/// interleaved. Under [`FailurePolicy::Abort`] the first failure is returned
/// and no later page is touched. Under [`FailurePolicy::Skip`] failed pages
/// are recorded and left out of the text.
///
/// `stats.total_pages` is the number of pages in `pages`; callers that
/// selected a subset of a document overwrite it with the document page count.
pub async fn run_pages<I>(
    pages: I,
    provider: &dyn OcrProvider,
    config: &OcrConfig,
) -> Result<OcrOutput, PdfOcrError>
where
    I: IntoIterator<Item = Result<PageImage, PdfOcrError>>,
    I::IntoIter: ExactSizeIterator,
{
    let total_start = Instant::now();
    let mut pages = pages.into_iter();
    let total = pages.len();
    let callback = config.progress_callback.as_ref();

    info!("Recognising {} pages with {}", total, provider.name());
    if let Some(cb) = callback {
        cb.on_conversion_start(total);
    }

    let mut results: Vec<PageResult> = Vec::with_capacity(total);
    let mut render_ms = 0u64;
    let mut ocr_ms = 0u64;
    // Position in the selection, for progress events.
    let mut position = 0usize;

    loop {
        let render_start = Instant::now();
        let Some(next) = pages.next() else { break };
        position += 1;

        let outcome = match next {
            Ok(image) => {
                let page_num = image.page_num;
                if let Some(cb) = callback {
                    cb.on_page_start(page_num, total);
                }
                let encoded = encode_page(image);
                render_ms += render_start.elapsed().as_millis() as u64;

                match encoded {
                    Ok(encoded) => {
                        let ocr_start = Instant::now();
                        let recognised = provider.recognize(&encoded).await;
                        let duration_ms = ocr_start.elapsed().as_millis() as u64;
                        ocr_ms += duration_ms;
                        match recognised {
                            Ok(text) => Ok((page_num, text, duration_ms)),
                            Err(e) => Err((page_num, e, duration_ms)),
                        }
                    }
                    Err(e) => Err((
                        page_num,
                        PdfOcrError::RasterisationFailed {
                            page: page_num,
                            detail: format!("image encoding failed: {e}"),
                        },
                        0,
                    )),
                }
            }
            Err(e) => {
                render_ms += render_start.elapsed().as_millis() as u64;
                let page_num = failed_page_num(&e).unwrap_or(position);
                Err((page_num, e, 0))
            }
        };

        match outcome {
            Ok((page_num, text, duration_ms)) => {
                debug!("Page {}: {} chars in {}ms", page_num, text.len(), duration_ms);
                if let Some(cb) = callback {
                    cb.on_page_complete(page_num, total, text.len());
                }
                results.push(PageResult {
                    page_num,
                    text,
                    duration_ms,
                    error: None,
                });
            }
            Err((page_num, err, duration_ms)) => {
                if let Some(cb) = callback {
                    cb.on_page_error(page_num, total, &err.to_string());
                }
                let page_error = match (config.failure_policy, err.to_page_error()) {
                    (FailurePolicy::Skip, Some(page_error)) => page_error,
                    _ => {
                        if let Some(cb) = callback {
                            cb.on_conversion_complete(total, success_count(&results));
                        }
                        return Err(err);
                    }
                };
                warn!("Skipping page {}: {}", page_num, page_error);
                results.push(PageResult {
                    page_num,
                    text: String::new(),
                    duration_ms,
                    error: Some(page_error),
                });
            }
        }
    }

    let processed = success_count(&results);
    let failed = results.len() - processed;
    if let Some(cb) = callback {
        cb.on_conversion_complete(total, processed);
    }

    if processed == 0 && failed > 0 {
        let first_error = results
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_default();
        return Err(PdfOcrError::AllPagesFailed {
            total: results.len(),
            first_error,
        });
    }

    let text = assemble_text(&results, &config.page_separator);
    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Recognised {}/{} pages in {}ms ({} failed)",
        processed, total, total_duration_ms, failed
    );

    Ok(OcrOutput {
        text,
        pages: results,
        stats: OcrStats {
            provider: provider.name().to_string(),
            total_pages: total,
            processed_pages: processed,
            failed_pages: failed,
            render_duration_ms: render_ms,
            ocr_duration_ms: ocr_ms,
            total_duration_ms,
        },
    })
}

fn success_count(results: &[PageResult]) -> usize {
    results.iter().filter(|p| p.is_success()).count()
}

fn failed_page_num(err: &PdfOcrError) -> Option<usize> {
    match err {
        PdfOcrError::RasterisationFailed { page, .. } | PdfOcrError::ProviderCall { page, .. } => {
            Some(*page)
        }
        _ => None,
    }
}

/// Join successful pages into the output text.
///
/// Each page becomes one segment: optional header line, then the text with
/// trailing line breaks trimmed, then a newline. Segments are separated by a
/// blank line. Failed pages are left out.
pub fn assemble_text(pages: &[PageResult], separator: &PageSeparator) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(pages.len());

    for page in pages.iter().filter(|p| p.is_success()) {
        let mut segment = String::new();
        if let Some(header) = separator.header(page.page_num, segments.is_empty()) {
            segment.push_str(&header);
            segment.push('\n');
        }
        segment.push_str(page.text.trim_end_matches(['\n', '\r']));
        segment.push('\n');
        segments.push(segment);
    }

    segments.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;

    fn ok(page_num: usize, text: &str) -> PageResult {
        PageResult {
            page_num,
            text: text.to_string(),
            duration_ms: 0,
            error: None,
        }
    }

    fn failed(page_num: usize) -> PageResult {
        PageResult {
            page_num,
            text: String::new(),
            duration_ms: 0,
            error: Some(PageError::RecognitionFailed {
                page: page_num,
                provider: "stub".into(),
                detail: "boom".into(),
            }),
        }
    }

    #[test]
    fn banner_segments() {
        let pages = [ok(1, "HELLO"), ok(2, "WORLD")];
        assert_eq!(
            assemble_text(&pages, &PageSeparator::Banner),
            "--- Page 1 ---\nHELLO\n\n--- Page 2 ---\nWORLD\n"
        );
    }

    #[test]
    fn trailing_newlines_are_normalised() {
        let pages = [ok(1, "HELLO\n\n"), ok(2, "WORLD\r\n")];
        assert_eq!(
            assemble_text(&pages, &PageSeparator::Banner),
            "--- Page 1 ---\nHELLO\n\n--- Page 2 ---\nWORLD\n"
        );
    }

    #[test]
    fn blank_page_keeps_its_header() {
        let pages = [ok(1, "")];
        assert_eq!(
            assemble_text(&pages, &PageSeparator::Banner),
            "--- Page 1 ---\n\n"
        );
    }

    #[test]
    fn horizontal_rule_only_between_pages() {
        let pages = [ok(1, "a"), ok(2, "b")];
        assert_eq!(
            assemble_text(&pages, &PageSeparator::HorizontalRule),
            "a\n\n---\nb\n"
        );
    }

    #[test]
    fn no_separator_is_blank_line() {
        let pages = [ok(1, "a"), ok(2, "b")];
        assert_eq!(assemble_text(&pages, &PageSeparator::None), "a\n\nb\n");
    }

    #[test]
    fn failed_pages_are_omitted() {
        let pages = [ok(1, "a"), failed(2), ok(3, "c")];
        assert_eq!(
            assemble_text(&pages, &PageSeparator::Comment),
            "<!-- page 1 -->\na\n\n<!-- page 3 -->\nc\n"
        );
    }

    #[test]
    fn hr_after_a_failed_first_page() {
        let pages = [failed(1), ok(2, "b")];
        assert_eq!(assemble_text(&pages, &PageSeparator::HorizontalRule), "b\n");
    }

    #[test]
    fn nothing_to_assemble() {
        assert_eq!(assemble_text(&[], &PageSeparator::Banner), "");
    }
}
