//! Input validation: make sure the user-supplied path is a readable PDF.
//!
//! pdfium reports a missing file and a corrupt file with the same opaque
//! error, so the checks happen here first. The `%PDF` magic bytes are
//! verified before returning so callers get a meaningful error instead of a
//! pdfium parse failure.

use crate::error::PdfOcrError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local file path: it must exist, be a regular readable file,
/// and start with the PDF magic bytes.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, PdfOcrError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(PdfOcrError::DocumentNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PdfOcrError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfOcrError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PdfOcrError::DocumentNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
