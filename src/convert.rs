//! Extraction entry points.
//!
//! Every entry point runs the same sequence: validate the input path, build
//! the provider (credentials are checked here, before any page is
//! rendered), open the PDF, then hand the lazy page sequence to
//! [`run_pages`]. The first configuration problem wins, so a missing file is
//! reported even when the provider would also have failed.
//!
//! The returned futures are not `Send`: pdfium documents must stay on the
//! thread that opened them. Await them directly (or use
//! [`extract_text_sync`]) rather than spawning them onto a multi-threaded
//! runtime.

use crate::config::OcrConfig;
use crate::error::PdfOcrError;
use crate::output::{OcrOutput, OcrStats};
use crate::pipeline::recognize::run_pages;
use crate::pipeline::{input, render::PdfRasterizer};
use crate::providers::{create_provider, OcrProvider, OcrService};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Extract the text of a PDF with one of the built-in cloud providers.
///
/// # Errors
/// Configuration problems (missing file, missing credentials, provider not
/// compiled in) are reported before any page is processed. With the default
/// [`crate::config::FailurePolicy::Abort`] the first failed page aborts the
/// run and no text is returned.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_ocr::{extract_text, OcrConfig, OcrService};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = extract_text("scan.pdf", OcrService::Azure, &OcrConfig::default()).await?;
/// print!("{}", output.text);
/// # Ok(())
/// # }
/// ```
pub async fn extract_text(
    input: impl AsRef<Path>,
    service: OcrService,
    config: &OcrConfig,
) -> Result<OcrOutput, PdfOcrError> {
    let pdf_path = input::resolve_local(input)?;
    let provider = create_provider(service, &config.providers).await?;
    run_document(&pdf_path, provider.as_ref(), config).await
}

/// Same as [`extract_text`], with a provider built by the caller.
pub async fn extract_text_with_provider(
    input: impl AsRef<Path>,
    provider: &dyn OcrProvider,
    config: &OcrConfig,
) -> Result<OcrOutput, PdfOcrError> {
    let pdf_path = input::resolve_local(input)?;
    run_document(&pdf_path, provider, config).await
}

/// Extract text and write it to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial file behind.
pub async fn extract_text_to_file(
    input: impl AsRef<Path>,
    service: OcrService,
    output_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<OcrStats, PdfOcrError> {
    let output = extract_text(input, service, config).await?;
    write_atomic(output_path.as_ref(), &output.text).await?;
    Ok(output.stats)
}

/// Extract text from a PDF held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed when this
/// function returns.
pub async fn extract_text_from_bytes(
    bytes: &[u8],
    service: OcrService,
    config: &OcrConfig,
) -> Result<OcrOutput, PdfOcrError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| PdfOcrError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| PdfOcrError::Internal(format!("tempfile write: {e}")))?;
    extract_text(tmp.path(), service, config).await
}

/// Blocking wrapper around [`extract_text`].
///
/// Creates a single-threaded tokio runtime internally; do not call it from
/// inside another runtime.
pub fn extract_text_sync(
    input: impl AsRef<Path>,
    service: OcrService,
    config: &OcrConfig,
) -> Result<OcrOutput, PdfOcrError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PdfOcrError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract_text(input, service, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_document(
    pdf_path: &Path,
    provider: &dyn OcrProvider,
    config: &OcrConfig,
) -> Result<OcrOutput, PdfOcrError> {
    let start = Instant::now();
    info!("Extracting text from {}", pdf_path.display());

    let rasterizer = PdfRasterizer::new(config)?;
    let document = rasterizer.open(pdf_path, config.password.as_deref())?;
    let pages = document.pages(&config.pages)?;

    let mut output = run_pages(pages, provider, config).await?;
    output.stats.total_pages = document.page_count();
    output.stats.total_duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Done: {}/{} pages via {} in {}ms",
        output.stats.processed_pages,
        output.stats.total_pages,
        output.stats.provider,
        output.stats.total_duration_ms
    );
    Ok(output)
}

pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<(), PdfOcrError> {
    let write_failed = |source| PdfOcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.txt");

        write_atomic(&target, "--- Page 1 ---\nHELLO\n").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "--- Page 1 ---\nHELLO\n"
        );
        assert!(!dir.path().join("nested").join("out.txt.tmp").exists());
    }

    #[tokio::test]
    async fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        std::fs::write(&target, "old").unwrap();

        write_atomic(&target, "new\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new\n");
    }

    #[tokio::test]
    async fn missing_input_is_reported_before_provider_setup() {
        // Azure credentials are absent too; the path check must win.
        let config = OcrConfig::builder()
            .providers(crate::config::ProviderSettings::default())
            .build()
            .unwrap();
        let err = extract_text("/no/such/scan.pdf", OcrService::Azure, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfOcrError::DocumentNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn bytes_that_are_not_a_pdf_are_rejected() {
        let err = extract_text_from_bytes(b"hello", OcrService::Azure, &OcrConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PdfOcrError::NotAPdf { .. }), "got {err:?}");
    }
}
