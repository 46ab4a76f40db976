//! Google Cloud Vision `images:annotate` with `TEXT_DETECTION`.
//!
//! Authentication uses application-default credentials through `gcp_auth`
//! (`GOOGLE_APPLICATION_CREDENTIALS`, the gcloud user login, or the metadata
//! server), unless an explicit service-account file is configured.

use super::{call_failed, check_status, http_client, request_failed, OcrProvider};
use crate::config::ProviderSettings;
use crate::error::PdfOcrError;
use crate::pipeline::encode::EncodedPage;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "google";
const ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

pub struct GoogleProvider {
    client: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
}

impl GoogleProvider {
    /// Resolve credentials: the configured service-account file, otherwise
    /// application-default credentials.
    pub async fn new(settings: &ProviderSettings) -> Result<Self, PdfOcrError> {
        let auth: Arc<dyn TokenProvider> = match &settings.google_credentials_path {
            Some(path) => {
                let account = CustomServiceAccount::from_file(path).map_err(|e| {
                    PdfOcrError::CredentialsMissing {
                        provider: NAME.into(),
                        hint: format!(
                            "Failed to load Google service account from '{}': {e}",
                            path.display()
                        ),
                    }
                })?;
                Arc::new(account)
            }
            None => gcp_auth::provider()
                .await
                .map_err(|e| PdfOcrError::CredentialsMissing {
                    provider: NAME.into(),
                    hint: format!(
                        "No Google application-default credentials found: {e}\n\
                         Run `gcloud auth application-default login` or set GOOGLE_APPLICATION_CREDENTIALS."
                    ),
                })?,
        };

        Ok(Self {
            client: http_client(settings)?,
            auth,
        })
    }
}

#[async_trait]
impl OcrProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn recognize(&self, page: &EncodedPage) -> Result<String, PdfOcrError> {
        let token = self
            .auth
            .token(SCOPES)
            .await
            .map_err(|e| call_failed(NAME, page.page_num, format!("token refresh failed: {e}")))?;

        let body = annotate_request(&page.bytes);
        let response = self
            .client
            .post(ANNOTATE_URL)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(NAME, page.page_num, e))?;

        let response = check_status(NAME, page.page_num, response).await?;
        let parsed: AnnotateResponse = response.json().await.map_err(|e| {
            call_failed(NAME, page.page_num, format!("malformed response: {e}"))
        })?;

        let text = annotation_text(parsed).map_err(|detail| call_failed(NAME, page.page_num, detail))?;
        debug!("Page {}: {} chars from Cloud Vision", page.page_num, text.len());
        Ok(text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Serialize)]
struct AnnotateImageRequest {
    image: RequestImage,
    features: Vec<RequestFeature>,
}

#[derive(Serialize)]
struct RequestImage {
    content: String,
}

#[derive(Serialize)]
struct RequestFeature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

fn annotate_request(image_bytes: &[u8]) -> AnnotateRequest {
    AnnotateRequest {
        requests: vec![AnnotateImageRequest {
            image: RequestImage {
                content: STANDARD.encode(image_bytes),
            },
            features: vec![RequestFeature {
                kind: "TEXT_DETECTION",
            }],
        }],
    }
}

/// The first text annotation holds the full text of the image.
fn annotation_text(response: AnnotateResponse) -> Result<String, String> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(status) = first.error {
        return Err(format!("Vision API error {}: {}", status.code, status.message));
    }
    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AnnotateResponse {
        serde_json::from_str(json).expect("valid response JSON")
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(annotate_request(b"abc")).unwrap();
        assert_eq!(body["requests"][0]["image"]["content"], "YWJj");
        assert_eq!(body["requests"][0]["features"][0]["type"], "TEXT_DETECTION");
    }

    #[test]
    fn first_annotation_is_the_page_text() {
        let response = parse(
            r#"{"responses":[{"textAnnotations":[
                {"locale":"en","description":"HELLO\nWORLD\n"},
                {"description":"HELLO"},
                {"description":"WORLD"}
            ]}]}"#,
        );
        assert_eq!(annotation_text(response).unwrap(), "HELLO\nWORLD\n");
    }

    #[test]
    fn blank_page_yields_empty_text() {
        assert_eq!(annotation_text(parse(r#"{"responses":[{}]}"#)).unwrap(), "");
        assert_eq!(annotation_text(parse(r#"{}"#)).unwrap(), "");
    }

    #[test]
    fn per_image_error_is_reported() {
        let response = parse(
            r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#,
        );
        let err = annotation_text(response).unwrap_err();
        assert!(err.contains("Bad image data."), "got: {err}");
        assert!(err.contains('3'));
    }

    #[tokio::test]
    async fn unreadable_service_account_is_credentials_error() {
        let settings = ProviderSettings {
            google_credentials_path: Some("/definitely/not/a/key.json".into()),
            ..ProviderSettings::default()
        };
        let err = GoogleProvider::new(&settings).await.err().expect("must fail");
        assert!(matches!(err, PdfOcrError::CredentialsMissing { ref provider, .. } if provider == "google"));
    }
}
