//! Error types for the edgequake-pdf-ocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfOcrError`] — **Fatal**: the run cannot proceed (bad input file,
//!   credentials missing, provider not compiled in, a page failed under the
//!   default fail-fast policy). Returned as `Err(PdfOcrError)` from the
//!   top-level `extract_text*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed while running with
//!   [`crate::config::FailurePolicy::Skip`]. Stored inside
//!   [`crate::output::PageResult`] so callers can see which pages are missing
//!   from the assembled text.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-ocr library.
#[derive(Debug, Error)]
pub enum PdfOcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    DocumentNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// pdfium could not read the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rasterising PDF pages needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the pdf-ocr binary.\n\
  • Download a build from https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Provider errors ───────────────────────────────────────────────────
    /// The service name does not match any supported provider.
    #[error("Unsupported OCR service '{0}'. Choose from: google, azure, aws")]
    UnknownService(String),

    /// Required credentials for the provider are absent or invalid.
    #[error("OCR provider '{provider}' is not configured.\n{hint}")]
    CredentialsMissing { provider: String, hint: String },

    /// The provider's client support was not compiled into this build.
    #[error(
        "OCR provider '{provider}' is not available in this build.\n\
Reinstall with the '{feature}' feature enabled, e.g.:\n  cargo install edgequake-pdf-ocr --features {feature}"
    )]
    DependencyMissing {
        provider: String,
        feature: &'static str,
    },

    /// A remote recognition call failed. Never retried.
    #[error("{provider} OCR call failed on page {page}: {detail}")]
    ProviderCall {
        provider: String,
        page: usize,
        detail: String,
    },

    /// Every selected page failed while running with the skip policy.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfOcrError {
    /// Convert a fatal per-page failure into its non-fatal form.
    ///
    /// Returns `None` for errors that are never page-scoped (missing
    /// credentials, bad input path…); those always abort the run.
    pub fn to_page_error(&self) -> Option<PageError> {
        match self {
            PdfOcrError::ProviderCall {
                provider,
                page,
                detail,
            } => Some(PageError::RecognitionFailed {
                page: *page,
                provider: provider.clone(),
                detail: detail.clone(),
            }),
            PdfOcrError::RasterisationFailed { page, detail } => Some(PageError::RenderFailed {
                page: *page,
                detail: detail.clone(),
            }),
            _ => None,
        }
    }
}

/// A non-fatal error for a single page.
///
/// Only produced under [`crate::config::FailurePolicy::Skip`]; the default
/// policy turns the first page failure into a [`PdfOcrError`].
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR provider call failed.
    #[error("Page {page}: {provider} OCR call failed: {detail}")]
    RecognitionFailed {
        page: usize,
        provider: String,
        detail: String,
    },
}
