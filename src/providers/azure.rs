//! Azure AI Vision Image Analysis 4.0, `read` feature.
//!
//! Needs `AZURE_VISION_ENDPOINT` and `AZURE_VISION_KEY`. Both are checked
//! when the provider is built, before any request leaves the process.

use super::{call_failed, check_status, http_client, request_failed, OcrProvider};
use crate::config::{ProviderSettings, AZURE_ENDPOINT_ENV, AZURE_KEY_ENV};
use crate::error::PdfOcrError;
use crate::pipeline::encode::EncodedPage;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

const NAME: &str = "azure";
const API_VERSION: &str = "2024-02-01";
const ANALYZE_PATH: &str = "computervision/imageanalysis:analyze";

pub struct AzureProvider {
    client: reqwest::Client,
    analyze_url: Url,
    key: String,
}

impl AzureProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, PdfOcrError> {
        let endpoint = required(settings.azure_endpoint.as_deref(), AZURE_ENDPOINT_ENV)?;
        let key = required(settings.azure_key.as_deref(), AZURE_KEY_ENV)?;
        let analyze_url = analyze_url(endpoint)?;

        Ok(Self {
            client: http_client(settings)?,
            analyze_url,
            key: key.to_string(),
        })
    }
}

fn required<'a>(value: Option<&'a str>, env_name: &str) -> Result<&'a str, PdfOcrError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PdfOcrError::CredentialsMissing {
            provider: NAME.into(),
            hint: format!(
                "Please set the {AZURE_ENDPOINT_ENV} and {AZURE_KEY_ENV} environment variables ({env_name} is missing)."
            ),
        })
}

fn analyze_url(endpoint: &str) -> Result<Url, PdfOcrError> {
    let base = endpoint.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/{ANALYZE_PATH}")).map_err(|e| {
        PdfOcrError::CredentialsMissing {
            provider: NAME.into(),
            hint: format!("{AZURE_ENDPOINT_ENV} is not a valid URL ('{endpoint}'): {e}"),
        }
    })?;
    url.query_pairs_mut()
        .append_pair("features", "read")
        .append_pair("api-version", API_VERSION);
    Ok(url)
}

#[async_trait]
impl OcrProvider for AzureProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn recognize(&self, page: &EncodedPage) -> Result<String, PdfOcrError> {
        let response = self
            .client
            .post(self.analyze_url.clone())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(page.bytes.clone())
            .send()
            .await
            .map_err(|e| request_failed(NAME, page.page_num, e))?;

        let response = check_status(NAME, page.page_num, response).await?;
        let parsed: AnalyzeResponse = response.json().await.map_err(|e| {
            call_failed(NAME, page.page_num, format!("malformed response: {e}"))
        })?;

        let text = read_text(parsed);
        debug!("Page {}: {} chars from AI Vision", page.page_num, text.len());
        Ok(text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    read_result: Option<ReadResult>,
}

#[derive(Debug, Deserialize)]
struct ReadResult {
    #[serde(default)]
    blocks: Vec<ReadBlock>,
}

#[derive(Debug, Deserialize)]
struct ReadBlock {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
struct ReadLine {
    #[serde(default)]
    text: String,
}

/// All recognised lines, block by block, one per output line.
fn read_text(response: AnalyzeResponse) -> String {
    response
        .read_result
        .map(|read| {
            read.blocks
                .into_iter()
                .flat_map(|b| b.lines)
                .map(|l| l.text)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(endpoint: Option<String>, key: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            azure_endpoint: endpoint,
            azure_key: key.map(str::to_string),
            api_timeout_secs: 5,
            ..ProviderSettings::default()
        }
    }

    fn page(page_num: usize) -> EncodedPage {
        EncodedPage {
            page_num,
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png",
        }
    }

    #[test]
    fn analyze_url_has_read_feature_and_version() {
        let url = analyze_url("https://demo.cognitiveservices.azure.com/").unwrap();
        assert_eq!(url.path(), "/computervision/imageanalysis:analyze");
        let query = url.query().unwrap();
        assert!(query.contains("features=read"));
        assert!(query.contains("api-version=2024-02-01"));
    }

    #[test]
    fn invalid_endpoint_is_credentials_error() {
        let err = AzureProvider::new(&settings(Some("not a url".into()), Some("k")))
            .err()
            .expect("must fail");
        assert!(err.to_string().contains(AZURE_ENDPOINT_ENV));
    }

    #[test]
    fn read_text_joins_lines_across_blocks() {
        let response: AnalyzeResponse = serde_json::from_value(json!({
            "modelVersion": "2023-10-01",
            "readResult": {"blocks": [
                {"lines": [{"text": "HELLO"}, {"text": "there"}]},
                {"lines": [{"text": "WORLD"}]}
            ]}
        }))
        .unwrap();
        assert_eq!(read_text(response), "HELLO\nthere\nWORLD");
    }

    #[test]
    fn missing_read_result_is_blank_page() {
        let response: AnalyzeResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(read_text(response), "");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = AzureProvider::new(&settings(Some(server.uri()), None))
            .err()
            .expect("key is missing");
        assert!(matches!(err, PdfOcrError::CredentialsMissing { .. }));
        assert!(err.to_string().contains(AZURE_KEY_ENV));
        // `expect(0)` is verified when the server drops.
    }

    #[tokio::test]
    async fn missing_endpoint_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = AzureProvider::new(&settings(None, Some("test-key")))
            .err()
            .expect("endpoint is missing");
        assert!(err.to_string().contains(AZURE_ENDPOINT_ENV));
        server.verify().await;
    }

    #[tokio::test]
    async fn recognize_posts_raw_bytes_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/computervision/imageanalysis:analyze"))
            .and(query_param("features", "read"))
            .and(header("Ocp-Apim-Subscription-Key", "test-key"))
            .and(header("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "readResult": {"blocks": [{"lines": [{"text": "HELLO"}]}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureProvider::new(&settings(Some(server.uri()), Some("test-key"))).unwrap();
        let text = provider.recognize(&page(1)).await.unwrap();
        assert_eq!(text, "HELLO");
    }

    #[tokio::test]
    async fn error_status_is_provider_call_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": "429", "message": "Rate limit exceeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureProvider::new(&settings(Some(server.uri()), Some("test-key"))).unwrap();
        let err = provider.recognize(&page(2)).await.unwrap_err();
        match err {
            PdfOcrError::ProviderCall {
                provider,
                page,
                detail,
            } => {
                assert_eq!(provider, "azure");
                assert_eq!(page, 2);
                assert!(detail.contains("429"), "got: {detail}");
                assert!(detail.contains("Rate limit exceeded"), "got: {detail}");
            }
            other => panic!("expected ProviderCall, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_provider_call_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let provider = AzureProvider::new(&settings(Some(server.uri()), Some("test-key"))).unwrap();
        let err = provider.recognize(&page(1)).await.unwrap_err();
        assert!(err.to_string().contains("malformed response"), "got: {err}");
    }
}
