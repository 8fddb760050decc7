//! Collection endpoint client
//!
//! One JSON POST per submission. There is no retry and no request timeout
//! beyond the HTTP client's defaults.

use async_trait::async_trait;

use crate::payload::SubmissionPayload;
use crate::TransmissionError;

/// Placeholder endpoint used when none is configured
pub const DEFAULT_COLLECTION_URL: &str =
    "https://YOUR-N8N-INSTANCE.app.n8n.cloud/webhook/niche-quiz";

const USER_AGENT: &str = concat!("quiz/", env!("CARGO_PKG_VERSION"));

/// Acknowledged (2xx) response from the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionResponse {
    pub status: u16,
    /// Raw body; opaque unless the endpoint returns an analysis
    pub body: String,
}

/// Capability receiving the final record
#[async_trait]
pub trait CollectionEndpoint: Send + Sync {
    /// Transmit `payload` once; non-2xx answers are errors
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<CollectionResponse, TransmissionError>;
}

/// Webhook client posting JSON
pub struct WebhookClient {
    http_client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self, TransmissionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransmissionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CollectionEndpoint for WebhookClient {
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<CollectionResponse, TransmissionError> {
        tracing::debug!(url = %self.url, fields = payload.len(), "Posting submission");

        let response = self
            .http_client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransmissionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %error_text,
                "Collection endpoint rejected submission"
            );
            return Err(TransmissionError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransmissionError::Network(e.to_string()))?;

        Ok(CollectionResponse {
            status: status.as_u16(),
            body,
        })
    }
}
