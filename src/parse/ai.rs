//! External structured extractor.
//!
//! The trait seam lets tests substitute a canned extractor; production uses
//! the HTTP implementation against a configured endpoint. Every failure
//! mode surfaces as an error so the parser can fall back to patterns.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::error::PipelineError;
use crate::models::DocumentType;

/// A service that turns raw document text into structured fields. The
/// returned value must be a JSON object; anything else is rejected by the
/// caller.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract_fields(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<Value, PipelineError>;
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
    document_type: &'a str,
}

/// Structured extractor speaking JSON over HTTP. Request timeout is bound
/// at client construction so a hung endpoint cannot stall the pipeline.
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PipelineError::ExtractorUnavailable {
                details: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl StructuredExtractor for HttpExtractor {
    async fn extract_fields(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<Value, PipelineError> {
        let mut request = self.client.post(&self.endpoint).json(&ExtractRequest {
            text,
            document_type: document_type.as_str(),
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::ExtractorUnavailable {
                details: format!("request to {} failed: {}", self.endpoint, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::ExtractorUnavailable {
                details: format!("extractor returned HTTP {}", status),
            });
        }

        let value: Value =
            response
                .json()
                .await
                .map_err(|e| PipelineError::MalformedExtractorOutput {
                    details: format!("response body is not JSON: {}", e),
                })?;

        debug!(
            "Structured extractor returned {} for {}",
            if value.is_object() { "an object" } else { "a non-object" },
            document_type.as_str()
        );
        Ok(value)
    }
}
