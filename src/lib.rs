//! # edgequake-pdf-ocr
//!
//! Extract text from scanned (image-only) PDF documents with a cloud OCR
//! service: Google Cloud Vision, Azure AI Vision or Amazon Textract.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      check the path is a readable PDF
//!  ├─ 2. Provider   build the selected OCR client, validate credentials
//!  ├─ 3. Render     rasterise one page at a time via pdfium
//!  ├─ 4. Encode     PNG
//!  ├─ 5. Recognize  one provider call per page, strictly in page order
//!  └─ 6. Output     page segments (`--- Page N ---`) + per-page stats
//! ```
//!
//! PDFs that already have a text layer can skip OCR entirely:
//! [`pdf_to_markdown`] turns font sizes into Markdown headings.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_ocr::{extract_text, OcrConfig, OcrService};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials: AZURE_VISION_ENDPOINT + AZURE_VISION_KEY
//!     let config = OcrConfig::default();
//!     let output = extract_text("scan.pdf", OcrService::Azure, &config).await?;
//!     print!("{}", output.text);
//!     eprintln!("{} pages in {}ms", output.stats.processed_pages, output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `google` | on      | Google Cloud Vision provider (`gcp_auth`) |
//! | `azure`  | on      | Azure AI Vision provider (REST only) |
//! | `aws`    | on      | Amazon Textract provider (`aws-sdk-textract`) |
//!
//! Selecting a provider whose feature is off fails with
//! [`PdfOcrError::DependencyMissing`]:
//! ```toml
//! edgequake-pdf-ocr = { version = "0.1", default-features = false, features = ["azure"] }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod providers;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FailurePolicy, OcrConfig, OcrConfigBuilder, PageSelection, PageSeparator, ProviderSettings,
};
pub use convert::{
    extract_text, extract_text_from_bytes, extract_text_sync, extract_text_to_file,
    extract_text_with_provider,
};
pub use error::{PageError, PdfOcrError};
pub use markdown::{pdf_to_markdown, pdf_to_markdown_file, render_markdown};
pub use output::{OcrOutput, OcrStats, PageResult};
pub use pipeline::encode::EncodedPage;
pub use pipeline::render::{PageImage, PageTextLayer, TextRun};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use providers::{create_provider, OcrProvider, OcrService};
