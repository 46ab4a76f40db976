//! Cloud OCR backends behind one [`OcrProvider`] trait.
//!
//! The set of providers is closed: [`OcrService`] names them and
//! [`create_provider`] builds the selected one. Each backend sits behind its
//! own Cargo feature (`google`, `azure`, `aws`) so a build can leave out SDKs
//! it does not need; selecting a provider that was compiled out yields
//! [`PdfOcrError::DependencyMissing`] naming the feature.
//!
//! Construction validates credentials up front. A provider that was built
//! successfully only fails per call, with [`PdfOcrError::ProviderCall`].

use crate::config::ProviderSettings;
use crate::error::PdfOcrError;
use crate::pipeline::encode::EncodedPage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "aws")]
pub mod aws;
#[cfg(feature = "azure")]
pub mod azure;
#[cfg(feature = "google")]
pub mod google;

/// A text-recognition backend.
///
/// `recognize` makes exactly one remote call and never retries. An empty
/// string is a valid result (blank page).
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Recognise the text on one encoded page.
    async fn recognize(&self, page: &EncodedPage) -> Result<String, PdfOcrError>;
}

/// The supported cloud OCR services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrService {
    /// Google Cloud Vision.
    Google,
    /// Azure AI Vision.
    Azure,
    /// Amazon Textract.
    Aws,
}

impl OcrService {
    pub const ALL: [OcrService; 3] = [OcrService::Google, OcrService::Azure, OcrService::Aws];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrService::Google => "google",
            OcrService::Azure => "azure",
            OcrService::Aws => "aws",
        }
    }

    /// Cargo feature that compiles this provider in.
    pub fn feature(&self) -> &'static str {
        self.as_str()
    }

    /// Whether this build includes the provider.
    pub fn is_available(&self) -> bool {
        match self {
            OcrService::Google => cfg!(feature = "google"),
            OcrService::Azure => cfg!(feature = "azure"),
            OcrService::Aws => cfg!(feature = "aws"),
        }
    }
}

impl fmt::Display for OcrService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrService {
    type Err = PdfOcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(OcrService::Google),
            "azure" => Ok(OcrService::Azure),
            "aws" => Ok(OcrService::Aws),
            other => Err(PdfOcrError::UnknownService(other.to_string())),
        }
    }
}

/// Build the provider for `service`, validating its credentials.
///
/// No OCR request is sent here; failures are configuration errors.
pub async fn create_provider(
    service: OcrService,
    settings: &ProviderSettings,
) -> Result<Arc<dyn OcrProvider>, PdfOcrError> {
    if !service.is_available() {
        return Err(PdfOcrError::DependencyMissing {
            provider: service.to_string(),
            feature: service.feature(),
        });
    }

    let provider = build(service, settings).await?;
    info!("OCR provider ready: {}", provider.name());
    Ok(provider)
}

async fn build(
    service: OcrService,
    settings: &ProviderSettings,
) -> Result<Arc<dyn OcrProvider>, PdfOcrError> {
    match service {
        #[cfg(feature = "google")]
        OcrService::Google => Ok(Arc::new(google::GoogleProvider::new(settings).await?)),
        #[cfg(feature = "azure")]
        OcrService::Azure => Ok(Arc::new(azure::AzureProvider::new(settings)?)),
        #[cfg(feature = "aws")]
        OcrService::Aws => Ok(Arc::new(aws::AwsProvider::new(settings).await?)),
        #[allow(unreachable_patterns)]
        other => {
            let _ = settings;
            Err(PdfOcrError::DependencyMissing {
                provider: other.to_string(),
                feature: other.feature(),
            })
        }
    }
}

// ── Shared helpers for the REST providers ────────────────────────────────

/// Longest slice of an error response body kept in error messages.
#[cfg(any(feature = "google", feature = "azure"))]
const MAX_ERROR_BODY: usize = 500;

#[cfg(any(feature = "google", feature = "azure"))]
pub(crate) fn http_client(settings: &ProviderSettings) -> Result<reqwest::Client, PdfOcrError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(settings.api_timeout_secs))
        .user_agent(concat!("edgequake-pdf-ocr/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PdfOcrError::Internal(format!("Failed to build HTTP client: {e}")))
}

pub(crate) fn call_failed(provider: &str, page: usize, detail: impl Into<String>) -> PdfOcrError {
    PdfOcrError::ProviderCall {
        provider: provider.to_string(),
        page,
        detail: detail.into(),
    }
}

#[cfg(any(feature = "google", feature = "azure"))]
pub(crate) fn request_failed(provider: &str, page: usize, e: reqwest::Error) -> PdfOcrError {
    if e.is_timeout() {
        call_failed(provider, page, format!("request timed out: {e}"))
    } else {
        call_failed(provider, page, e.to_string())
    }
}

/// Pass successful responses through; turn error statuses into
/// [`PdfOcrError::ProviderCall`] carrying the status and the start of the body.
#[cfg(any(feature = "google", feature = "azure"))]
pub(crate) async fn check_status(
    provider: &str,
    page: usize,
    response: reqwest::Response,
) -> Result<reqwest::Response, PdfOcrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(call_failed(provider, page, format!("HTTP {status}: {body}")))
}
