//! Configuration types for PDF text extraction.
//!
//! All run behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. Provider credentials live in a separate
//! [`ProviderSettings`] value so they can be resolved once at startup and
//! passed around read-only.

use crate::error::PdfOcrError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable holding the Azure AI Vision endpoint URL.
pub const AZURE_ENDPOINT_ENV: &str = "AZURE_VISION_ENDPOINT";
/// Environment variable holding the Azure AI Vision access key.
pub const AZURE_KEY_ENV: &str = "AZURE_VISION_KEY";

/// Configuration for one extraction run.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf_ocr::{FailurePolicy, OcrConfig, PageSelection};
///
/// let config = OcrConfig::builder()
///     .dpi(300)
///     .pages(PageSelection::Range(1, 3))
///     .failure_policy(FailurePolicy::Skip)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 200.
    ///
    /// Cloud OCR engines read 200–300 DPI scans reliably; lower values lose
    /// small print, higher values mostly grow the upload.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    ///
    /// Caps memory for oversized pages (posters, drawings) and keeps uploads
    /// under provider size limits regardless of DPI.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Page boundary marker in the assembled text. Default: banner.
    pub page_separator: PageSeparator,

    /// What to do when a single page fails. Default: abort.
    pub failure_policy: FailurePolicy,

    /// Credentials and client settings for the cloud providers.
    /// Default: [`ProviderSettings::from_env`].
    pub providers: ProviderSettings,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 4000,
            password: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            failure_policy: FailurePolicy::default(),
            providers: ProviderSettings::from_env(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("failure_policy", &self.failure_policy)
            .field("providers", &self.providers)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn providers(mut self, settings: ProviderSettings) -> Self {
        self.config.providers = settings;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, PdfOcrError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(PdfOcrError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.providers.api_timeout_secs == 0 {
            return Err(PdfOcrError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(PdfOcrError::InvalidConfig(format!(
                    "Invalid page range {start}-{end}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Provider settings ────────────────────────────────────────────────────

/// Credentials and client options for the cloud OCR providers.
///
/// Only the fields of the selected provider are consulted. Google and AWS
/// fall back to their ambient credential chains when their fields are unset.
#[derive(Clone)]
pub struct ProviderSettings {
    /// Azure AI Vision endpoint, e.g. `https://my-resource.cognitiveservices.azure.com`.
    pub azure_endpoint: Option<String>,
    /// Azure AI Vision subscription key.
    pub azure_key: Option<String>,
    /// Service-account JSON for Google Cloud Vision. Application-default
    /// credentials are used when unset.
    pub google_credentials_path: Option<PathBuf>,
    /// AWS region override for Textract. The SDK's region chain is used when unset.
    pub aws_region: Option<String>,
    /// Per-request HTTP timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            azure_endpoint: None,
            azure_key: None,
            google_credentials_path: None,
            aws_region: None,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("azure_endpoint", &self.azure_endpoint)
            .field("azure_key", &self.azure_key.as_ref().map(|_| "<redacted>"))
            .field("google_credentials_path", &self.google_credentials_path)
            .field("aws_region", &self.aws_region)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ProviderSettings {
    /// Read Azure credentials from `AZURE_VISION_ENDPOINT` / `AZURE_VISION_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`ProviderSettings::from_env`] but with a caller-supplied lookup,
    /// so tests never touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            azure_endpoint: non_empty(AZURE_ENDPOINT_ENV),
            azure_key: non_empty(AZURE_KEY_ENV),
            ..Self::default()
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the pipeline reacts to a page that cannot be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop at the first failed page and return its error. (default)
    #[default]
    Abort,
    /// Record the failure, leave the page out of the text, keep going.
    Skip,
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process all pages (default).
    #[default]
    All,
    /// Process a single page (1-indexed).
    Single(usize),
    /// Process a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Process specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl FromStr for PageSelection {
    type Err = PdfOcrError;

    /// Parse the CLI spelling: `all`, `5`, `3-15` or `1,3,5`. Pages are 1-indexed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let page = |p: &str| -> Result<usize, PdfOcrError> {
            match p.trim().parse::<usize>() {
                Ok(0) => Err(PdfOcrError::InvalidConfig(
                    "pages are 1-indexed, minimum is 1 (got 0)".into(),
                )),
                Ok(n) => Ok(n),
                Err(_) => Err(PdfOcrError::InvalidConfig(format!(
                    "invalid page number '{}' in '{s}'",
                    p.trim()
                ))),
            }
        };

        if s == "all" {
            Ok(PageSelection::All)
        } else if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (page(start)?, page(end)?);
            if start > end {
                return Err(PdfOcrError::InvalidConfig(format!(
                    "page range {start}-{end}: start must be <= end"
                )));
            }
            Ok(PageSelection::Range(start, end))
        } else if s.contains(',') {
            s.split(',')
                .map(page)
                .collect::<Result<Vec<_>, _>>()
                .map(PageSelection::Set)
        } else {
            page(&s).map(PageSelection::Single)
        }
    }
}

/// How page boundaries are marked in the assembled text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// `--- Page N ---` above every page. (default)
    #[default]
    Banner,
    /// `---` between pages.
    HorizontalRule,
    /// `<!-- page N -->` above every page.
    Comment,
    /// Blank line only.
    None,
    /// Custom header above every page; `{page}` expands to the page number.
    Custom(String),
}

impl PageSeparator {
    /// Parse the CLI spelling: `banner`, `hr`, `comment`, `none`, or custom text.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "banner" => PageSeparator::Banner,
            "hr" | "---" => PageSeparator::HorizontalRule,
            "comment" => PageSeparator::Comment,
            "none" => PageSeparator::None,
            _ => PageSeparator::Custom(s.to_string()),
        }
    }

    /// Header line placed above the text of `page_num` (1-indexed).
    ///
    /// `first` is true for the first emitted segment.
    pub fn header(&self, page_num: usize, first: bool) -> Option<String> {
        match self {
            PageSeparator::Banner => Some(format!("--- Page {page_num} ---")),
            PageSeparator::HorizontalRule if first => None,
            PageSeparator::HorizontalRule => Some("---".to_string()),
            PageSeparator::Comment => Some(format!("<!-- page {page_num} -->")),
            PageSeparator::None => None,
            PageSeparator::Custom(s) => Some(s.replace("{page}", &page_num.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OcrConfig::default();
        assert_eq!(config.dpi, 200);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.page_separator, PageSeparator::Banner);
        assert_eq!(config.providers.api_timeout_secs, 60);
    }

    #[test]
    fn builder_clamps_dpi() {
        let config = OcrConfig::builder().dpi(1000).build().unwrap();
        assert_eq!(config.dpi, 400);
        let config = OcrConfig::builder().dpi(10).build().unwrap();
        assert_eq!(config.dpi, 72);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let settings = ProviderSettings {
            api_timeout_secs: 0,
            ..ProviderSettings::default()
        };
        let err = OcrConfig::builder().providers(settings).build().unwrap_err();
        assert!(matches!(err, PdfOcrError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_inverted_range() {
        let err = OcrConfig::builder()
            .pages(PageSelection::Range(5, 2))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("5-2"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(9).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn page_selection_parses_cli_forms() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!(" ALL ".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("5".parse::<PageSelection>().unwrap(), PageSelection::Single(5));
        assert_eq!(
            "3-15".parse::<PageSelection>().unwrap(),
            PageSelection::Range(3, 15)
        );
        assert_eq!(
            "1, 3,5".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn page_selection_rejects_bad_input() {
        for bad in ["0", "9-2", "0-2", "1,0", "one", "", "2-"] {
            let err = bad.parse::<PageSelection>().unwrap_err();
            assert!(matches!(err, PdfOcrError::InvalidConfig(_)), "{bad:?} gave {err:?}");
        }
    }

    #[test]
    fn separator_headers() {
        assert_eq!(
            PageSeparator::Banner.header(3, false).as_deref(),
            Some("--- Page 3 ---")
        );
        assert_eq!(PageSeparator::HorizontalRule.header(1, true), None);
        assert_eq!(
            PageSeparator::HorizontalRule.header(2, false).as_deref(),
            Some("---")
        );
        assert_eq!(
            PageSeparator::Comment.header(7, true).as_deref(),
            Some("<!-- page 7 -->")
        );
        assert_eq!(PageSeparator::None.header(1, false), None);
        assert_eq!(
            PageSeparator::Custom("== {page} ==".into())
                .header(12, true)
                .as_deref(),
            Some("== 12 ==")
        );
    }

    #[test]
    fn separator_parse() {
        assert_eq!(PageSeparator::parse("HR"), PageSeparator::HorizontalRule);
        assert_eq!(PageSeparator::parse("banner"), PageSeparator::Banner);
        assert_eq!(
            PageSeparator::parse("### {page}"),
            PageSeparator::Custom("### {page}".into())
        );
    }

    #[test]
    fn settings_from_lookup_ignores_blank_values() {
        let settings = ProviderSettings::from_lookup(|name| match name {
            AZURE_ENDPOINT_ENV => Some("https://example.cognitiveservices.azure.com".into()),
            AZURE_KEY_ENV => Some("   ".into()),
            _ => None,
        });
        assert!(settings.azure_endpoint.is_some());
        assert!(settings.azure_key.is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let settings = ProviderSettings {
            azure_key: Some("super-secret".into()),
            ..ProviderSettings::default()
        };
        let dbg = format!("{settings:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
