//! Amazon Textract `DetectDocumentText` through the AWS SDK.
//!
//! Credentials and region come from the standard AWS chain (environment,
//! `~/.aws/config`, SSO, instance metadata). Only the region can be
//! overridden here.

use super::{call_failed, OcrProvider};
use crate::config::ProviderSettings;
use crate::error::PdfOcrError;
use crate::pipeline::encode::EncodedPage;
use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_textract::config::Region;
use aws_sdk_textract::error::DisplayErrorContext;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{Block, BlockType, Document};
use aws_sdk_textract::Client;
use std::time::Duration;
use tracing::{debug, info};

const NAME: &str = "aws";

pub struct AwsProvider {
    client: Client,
}

impl AwsProvider {
    pub async fn new(settings: &ProviderSettings) -> Result<Self, PdfOcrError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(settings.api_timeout_secs))
                .build(),
        );
        if let Some(region) = settings.aws_region.as_deref().map(str::trim) {
            if !region.is_empty() {
                loader = loader.region(Region::new(region.to_string()));
            }
        }
        let sdk_config = loader.load().await;

        let Some(region) = sdk_config.region() else {
            return Err(PdfOcrError::CredentialsMissing {
                provider: NAME.into(),
                hint: "No AWS region configured. Set AWS_REGION, add a region to ~/.aws/config, \
                       or pass --aws-region."
                    .into(),
            });
        };
        let missing_credentials = |detail: String| PdfOcrError::CredentialsMissing {
            provider: NAME.into(),
            hint: format!(
                "No AWS credentials found ({detail}). Configure ~/.aws/credentials \
                 or set AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY."
            ),
        };
        // The default chain is always installed; resolve it now so a missing
        // identity fails here and not on the first page.
        let Some(credentials) = sdk_config.credentials_provider() else {
            return Err(missing_credentials("no credentials provider".into()));
        };
        credentials
            .provide_credentials()
            .await
            .map_err(|e| missing_credentials(DisplayErrorContext(&e).to_string()))?;
        info!("Textract client configured for region {}", region);

        Ok(Self {
            client: Client::new(&sdk_config),
        })
    }
}

#[async_trait]
impl OcrProvider for AwsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn recognize(&self, page: &EncodedPage) -> Result<String, PdfOcrError> {
        let document = Document::builder()
            .bytes(Blob::new(page.bytes.clone()))
            .build();

        let output = self
            .client
            .detect_document_text()
            .document(document)
            .send()
            .await
            .map_err(|e| call_failed(NAME, page.page_num, DisplayErrorContext(&e).to_string()))?;

        let text = line_text(output.blocks());
        debug!("Page {}: {} chars from Textract", page.page_num, text.len());
        Ok(text)
    }
}

/// Text of every `LINE` block, in the order Textract returns them.
fn line_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter(|b| b.block_type() == Some(&BlockType::Line))
        .filter_map(|b| b.text())
        .collect::<Vec<_>>()
        .join("\n")
}
