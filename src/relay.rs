//! Relay Client
//!
//! The only component with network capability. Turns submit/poll requests
//! into single HTTP calls against the local automation service and
//! normalizes every transport failure into [`RelayError`]. Retry policy does
//! not live here; the orchestrator owns it.

use crate::config::ServiceConfig;
use crate::document::PostUrl;
use crate::error::RelayError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Remote processing status as reported by the poll endpoint.
///
/// The service answers `"unknown"` for identifiers it has never seen; that
/// and any future status strings land in `Unrecognized` so the state machine
/// can apply its conservative freeze rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Processing,
    Completed,
    Failed,
    Unrecognized(String),
}

impl RemoteStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "processing" => RemoteStatus::Processing,
            "completed" => RemoteStatus::Completed,
            "failed" => RemoteStatus::Failed,
            other => RemoteStatus::Unrecognized(other.to_string()),
        }
    }
}

/// Acknowledgment returned by the submit endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl SubmitAck {
    /// The service queued the post for processing.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// One poll result for an identifier.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: RemoteStatus,
}

/// Liveness snapshot of the automation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub queue_size: u64,
}

/// Relay client contract.
///
/// Implementations must stay correct under concurrent invocation for the
/// same or different identifiers and must not hold mutable state beyond
/// transport configuration. Deduplication is explicitly not their job.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Submit a post for remote processing.
    async fn submit(&self, url: &PostUrl) -> Result<SubmitAck, RelayError>;

    /// Ask the service for the current processing status of a post.
    async fn poll(&self, url: &PostUrl) -> Result<StatusReport, RelayError>;

    /// Check that the service is up and report its queue depth.
    async fn health(&self) -> Result<ServiceHealth, RelayError>;
}

// Wire types for the automation service endpoints.
#[derive(Serialize)]
struct ShareRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct CheckResponse {
    #[allow(dead_code)]
    url: Option<String>,
    status: String,
}

/// Map reqwest transport errors into the uniform relay error shape.
fn map_http_error(error: reqwest::Error) -> RelayError {
    if error.is_timeout() {
        RelayError::Timeout(error.to_string())
    } else if error.is_connect() {
        RelayError::ConnectionFailed(error.to_string())
    } else {
        RelayError::InvalidResponse(error.to_string())
    }
}

/// HTTP implementation of [`RelayClient`].
///
/// Holds only the reqwest client and the service base address.
pub struct HttpRelayClient {
    client: Client,
    base_url: String,
}

impl HttpRelayClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, RelayError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                RelayError::InvalidResponse(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Validate status before touching the body; a non-2xx answer is a
    /// failure even when it carries valid JSON.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RelayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RelayError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn submit(&self, url: &PostUrl) -> Result<SubmitAck, RelayError> {
        let endpoint = format!("{}/share", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .json(&ShareRequest { url: url.as_str() })
            .send()
            .await
            .map_err(map_http_error)?;

        let response = Self::check_status(response).await?;

        response
            .json::<SubmitAck>()
            .await
            .map_err(|e| RelayError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn poll(&self, url: &PostUrl) -> Result<StatusReport, RelayError> {
        let endpoint = format!(
            "{}/check/{}",
            self.base_url,
            urlencoding::encode(url.as_str())
        );
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(map_http_error)?;

        let response = Self::check_status(response).await?;

        let check: CheckResponse = response
            .json()
            .await
            .map_err(|e| RelayError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(StatusReport {
            status: RemoteStatus::parse(&check.status),
        })
    }

    async fn health(&self) -> Result<ServiceHealth, RelayError> {
        let endpoint = format!("{}/status", self.base_url);
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(map_http_error)?;

        let response = Self::check_status(response).await?;

        response
            .json::<ServiceHealth>()
            .await
            .map_err(|e| RelayError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}
