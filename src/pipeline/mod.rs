//! Pipeline stages for PDF text extraction.
//!
//! Each submodule implements one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ recognize
//! (path)    (pdfium)   (PNG)      (cloud OCR, one page at a time)
//! ```
//!
//! 1. [`input`]     — check the user-supplied path is a readable PDF
//! 2. [`render`]    — lazily rasterise the selected pages
//! 3. [`encode`]    — PNG-encode each `DynamicImage` for upload
//! 4. [`recognize`] — send each page to the provider in page order and
//!    assemble the text; the only stage with network I/O

pub mod encode;
pub mod input;
pub mod recognize;
pub mod render;
