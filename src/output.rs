//! Result types returned by the extraction entry points.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Recognition outcome for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Recognised text; empty for blank pages and for failed pages.
    pub text: String,
    /// Wall-clock time of the provider call.
    pub duration_ms: u64,
    /// Set only when the page failed under [`crate::config::FailurePolicy::Skip`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrStats {
    /// Provider that recognised the pages (`google`, `azure`, `aws`, …).
    pub provider: String,
    /// Page count of the whole document.
    pub total_pages: usize,
    /// Pages recognised successfully.
    pub processed_pages: usize,
    /// Pages that failed (skip policy only).
    pub failed_pages: usize,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Assembled text with page separators, in page order.
    pub text: String,
    /// Per-page results, in page order.
    pub pages: Vec<PageResult>,
    pub stats: OcrStats,
}
