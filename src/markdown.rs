//! Text-layer PDF → Markdown, without OCR.
//!
//! For PDFs that already carry text. Font sizes decide the structure: the
//! size covering the most words is body text, every larger size becomes a
//! heading, the largest being `#`. Each page opens with `<!-- Page N -->`.
//!
//! When the document has no text objects with a usable size, pdfium's plain
//! text is returned instead, one page after another.

use crate::config::OcrConfig;
use crate::convert::write_atomic;
use crate::error::PdfOcrError;
use crate::pipeline::input;
use crate::pipeline::render::{PageTextLayer, PdfRasterizer, TextRun};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Markdown heading levels stop at `######`.
const MAX_HEADING_LEVEL: usize = 6;

/// Convert the text layer of a PDF to Markdown.
///
/// Honours `config.pages` and `config.password`; the provider settings are
/// not used.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_ocr::{pdf_to_markdown, OcrConfig};
///
/// let markdown = pdf_to_markdown("report.pdf", &OcrConfig::default())?;
/// print!("{markdown}");
/// # Ok::<(), edgequake_pdf_ocr::PdfOcrError>(())
/// ```
pub fn pdf_to_markdown(input: impl AsRef<Path>, config: &OcrConfig) -> Result<String, PdfOcrError> {
    let pdf_path = input::resolve_local(input)?;
    info!("Converting text layer of {} to Markdown", pdf_path.display());

    let rasterizer = PdfRasterizer::new(config)?;
    let document = rasterizer.open(&pdf_path, config.password.as_deref())?;
    let pages = document.text_layer(&config.pages)?;
    Ok(render_markdown(&pages))
}

/// Convert the text layer of a PDF and write the Markdown to `output_path`
/// atomically.
pub async fn pdf_to_markdown_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<(), PdfOcrError> {
    let markdown = pdf_to_markdown(input, config)?;
    write_atomic(output_path.as_ref(), &markdown).await
}

/// Build Markdown from already extracted text layers.
pub fn render_markdown(pages: &[PageTextLayer]) -> String {
    let histogram = size_histogram(pages);
    let Some(body) = body_size(&histogram) else {
        warn!("No font size information in the text layer, falling back to plain text");
        return plain_text(pages);
    };
    let levels = heading_levels(&histogram, body);

    let rendered: Vec<String> = pages
        .iter()
        .filter_map(|page| render_page(page, &levels))
        .collect();
    if rendered.is_empty() {
        return String::new();
    }
    let mut markdown = rendered.join("\n\n");
    markdown.push('\n');
    markdown
}

fn render_page(page: &PageTextLayer, levels: &HashMap<u32, usize>) -> Option<String> {
    // (heading level, words); level 0 is body text
    let mut blocks: Vec<(usize, Vec<&str>)> = Vec::new();
    for run in page.runs.iter().filter(|r| has_size(r)) {
        let level = levels.get(&rounded(run.size)).copied().unwrap_or(0);
        let words = run.text.split_whitespace();
        match blocks.last_mut() {
            Some((last, block)) if *last == level => block.extend(words),
            _ => blocks.push((level, words.collect())),
        }
    }
    if blocks.is_empty() {
        return None;
    }

    let mut out = format!("<!-- Page {} -->", page.page_num);
    for (level, words) in blocks {
        out.push_str("\n\n");
        if level > 0 {
            out.push_str(&"#".repeat(level));
            out.push(' ');
        }
        out.push_str(&words.join(" "));
    }
    Some(out)
}

fn plain_text(pages: &[PageTextLayer]) -> String {
    pages
        .iter()
        .map(|p| p.plain.trim_end_matches(['\n', '\r']))
        .filter(|text| !text.trim().is_empty())
        .map(|text| format!("{text}\n"))
        .collect()
}

fn has_size(run: &TextRun) -> bool {
    run.size.is_finite() && run.size > 0.0
}

fn rounded(size: f32) -> u32 {
    size.round() as u32
}

/// Words per rounded font size.
fn size_histogram(pages: &[PageTextLayer]) -> BTreeMap<u32, usize> {
    let mut histogram = BTreeMap::new();
    for run in pages.iter().flat_map(|p| &p.runs).filter(|r| has_size(r)) {
        let words = run.text.split_whitespace().count();
        if words > 0 {
            *histogram.entry(rounded(run.size)).or_insert(0) += words;
        }
    }
    histogram
}

/// The size with the most words. Ties go to the smaller size.
fn body_size(histogram: &BTreeMap<u32, usize>) -> Option<u32> {
    histogram
        .iter()
        .max_by(|(size_a, a), (size_b, b)| a.cmp(b).then(size_b.cmp(size_a)))
        .map(|(size, _)| *size)
}

/// Heading level for every size above `body`: the largest is 1.
fn heading_levels(histogram: &BTreeMap<u32, usize>, body: u32) -> HashMap<u32, usize> {
    histogram
        .keys()
        .rev()
        .filter(|&&size| size > body)
        .enumerate()
        .map(|(i, &size)| (size, (i + 1).min(MAX_HEADING_LEVEL)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, size: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            size,
        }
    }

    fn page(page_num: usize, runs: Vec<TextRun>) -> PageTextLayer {
        let plain = runs
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        PageTextLayer {
            page_num,
            runs,
            plain,
        }
    }

    #[test]
    fn larger_sizes_become_headings() {
        let pages = vec![page(
            1,
            vec![
                run("Annual Report", 24.0),
                run("Summary", 16.0),
                run("Revenue grew in every region this year.", 11.0),
                run("Costs were flat.", 11.0),
            ],
        )];

        assert_eq!(
            render_markdown(&pages),
            "<!-- Page 1 -->\n\n# Annual Report\n\n## Summary\n\n\
             Revenue grew in every region this year. Costs were flat.\n"
        );
    }

    #[test]
    fn body_is_the_size_with_most_words_not_the_smallest() {
        let pages = vec![page(
            1,
            vec![
                run("fine print", 8.0),
                run("one two three four five six", 12.0),
            ],
        )];
        let histogram = size_histogram(&pages);
        assert_eq!(body_size(&histogram), Some(12));
        assert!(heading_levels(&histogram, 12).is_empty());
        assert_eq!(
            render_markdown(&pages),
            "<!-- Page 1 -->\n\nfine print one two three four five six\n"
        );
    }

    #[test]
    fn sizes_are_rounded_before_counting() {
        let pages = vec![page(
            1,
            vec![run("a b", 11.8), run("c d", 12.2), run("Title", 17.6)],
        )];
        let histogram = size_histogram(&pages);
        assert_eq!(histogram.get(&12), Some(&4));
        assert_eq!(heading_levels(&histogram, 12).get(&18), Some(&1));
    }

    #[test]
    fn ties_pick_the_smaller_size_as_body() {
        let histogram = BTreeMap::from([(10, 3), (14, 3)]);
        assert_eq!(body_size(&histogram), Some(10));
    }

    #[test]
    fn heading_levels_stop_at_six() {
        let mut histogram = BTreeMap::from([(10, 100)]);
        for size in 11..=19 {
            histogram.insert(size, 1);
        }
        let levels = heading_levels(&histogram, 10);
        assert_eq!(levels[&19], 1);
        assert_eq!(levels[&14], 6);
        assert_eq!(levels[&11], 6);
        assert!(!levels.contains_key(&10));
    }

    #[test]
    fn every_page_is_marked_and_empty_pages_are_skipped() {
        let pages = vec![
            page(1, vec![run("HELLO", 12.0)]),
            page(2, vec![]),
            page(3, vec![run("WORLD", 12.0)]),
        ];
        assert_eq!(
            render_markdown(&pages),
            "<!-- Page 1 -->\n\nHELLO\n\n<!-- Page 3 -->\n\nWORLD\n"
        );
    }

    #[test]
    fn missing_sizes_fall_back_to_plain_text() {
        let pages = vec![
            PageTextLayer {
                page_num: 1,
                runs: vec![run("HELLO", 0.0)],
                plain: "HELLO\r\n".into(),
            },
            PageTextLayer {
                page_num: 2,
                runs: vec![],
                plain: "WORLD".into(),
            },
        ];
        assert_eq!(render_markdown(&pages), "HELLO\nWORLD\n");
    }

    #[test]
    fn document_without_text_is_empty() {
        assert_eq!(render_markdown(&[]), "");
        assert_eq!(render_markdown(&[page(1, vec![])]), "");
    }

    #[tokio::test]
    async fn missing_input_is_reported_before_pdfium_is_loaded() {
        let err = pdf_to_markdown_file(
            "/definitely/not/here.pdf",
            std::env::temp_dir().join("never-written.md"),
            &OcrConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PdfOcrError::DocumentNotFound { .. }), "got {err:?}");
    }
}
