//! Message-bus boundary between the page context and the privileged context.
//!
//! The page-scripting side has no cross-origin network access; it talks to a
//! privileged, long-lived background context through a two-message bus. This
//! module models that bus: tagged request envelopes, a uniform
//! `{ success, data?, error? }` response shape, a stateless [`BridgeServer`]
//! on the privileged side, and a [`BridgeHandle`] that implements
//! [`RelayClient`] over the channel so the state machine never sees the
//! serialization layer.
//!
//! Guard state deliberately does NOT live here. The server can be torn down
//! and restarted (extension reload) without corrupting any in-flight
//! submission bookkeeping on the page side.

use crate::document::PostUrl;
use crate::error::RelayError;
use crate::relay::{RelayClient, RemoteStatus, ServiceHealth, StatusReport, SubmitAck};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Request envelope crossing the privileged/unprivileged boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeRequest {
    #[serde(rename = "SHARE")]
    Share { url: String },
    #[serde(rename = "CHECK_STATUS")]
    CheckStatus { url: String },
    #[serde(rename = "STATUS")]
    Status,
}

/// Uniform response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type BridgeMessage = (BridgeRequest, oneshot::Sender<BridgeResponse>);

/// Privileged side of the bus.
///
/// Owns the network-capable relay client and services requests one at a
/// time. Stateless between calls: no caching, no dedup, nothing survives a
/// restart besides transport configuration.
pub struct BridgeServer {
    relay: Arc<dyn RelayClient>,
    rx: mpsc::UnboundedReceiver<BridgeMessage>,
}

impl BridgeServer {
    /// Create a server/handle pair wired by an in-process channel.
    pub fn new(relay: Arc<dyn RelayClient>) -> (Self, BridgeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { relay, rx }, BridgeHandle { tx })
    }

    /// Service requests until every handle is dropped.
    pub async fn run(mut self) {
        while let Some((request, reply)) = self.rx.recv().await {
            let response = dispatch(self.relay.as_ref(), request).await;
            // A dropped reply means the caller went away mid-call; nothing
            // to do but move on.
            if reply.send(response).is_err() {
                debug!("Bridge caller went away before the reply was ready");
            }
        }
        debug!("Bridge server shutting down: all handles dropped");
    }
}

/// Serialize one request into a relay call and its result back into the
/// uniform envelope. This is the only place results cross the boundary.
pub async fn dispatch(relay: &dyn RelayClient, request: BridgeRequest) -> BridgeResponse {
    match request {
        BridgeRequest::Share { url } => {
            let Some(post) = PostUrl::canonicalize(&url) else {
                return BridgeResponse::err(format!("Not a shareable post URL: {}", url));
            };
            match relay.submit(&post).await {
                Ok(ack) => match serde_json::to_value(&ack) {
                    Ok(value) => BridgeResponse::ok(value),
                    Err(e) => BridgeResponse::err(format!("Failed to encode response: {}", e)),
                },
                Err(e) => {
                    warn!(url = %post, error = %e, "Submit relay call failed");
                    BridgeResponse::err(e.to_string())
                }
            }
        }
        BridgeRequest::CheckStatus { url } => {
            let Some(post) = PostUrl::canonicalize(&url) else {
                return BridgeResponse::err(format!("Not a shareable post URL: {}", url));
            };
            match relay.poll(&post).await {
                Ok(report) => BridgeResponse::ok(serde_json::json!({
                    "url": post.as_str(),
                    "status": status_wire_str(&report.status),
                })),
                Err(e) => {
                    warn!(url = %post, error = %e, "Status relay call failed");
                    BridgeResponse::err(e.to_string())
                }
            }
        }
        BridgeRequest::Status => match relay.health().await {
            Ok(health) => match serde_json::to_value(&health) {
                Ok(value) => BridgeResponse::ok(value),
                Err(e) => BridgeResponse::err(format!("Failed to encode response: {}", e)),
            },
            Err(e) => BridgeResponse::err(e.to_string()),
        },
    }
}

fn status_wire_str(status: &RemoteStatus) -> &str {
    match status {
        RemoteStatus::Processing => "processing",
        RemoteStatus::Completed => "completed",
        RemoteStatus::Failed => "failed",
        RemoteStatus::Unrecognized(raw) => raw,
    }
}

/// Unprivileged side of the bus.
///
/// Implements [`RelayClient`] so the orchestrator is oblivious to the
/// boundary. A closed channel (the privileged context was torn down) maps to
/// [`RelayError::BridgeClosed`], the distinct error class the orchestrator
/// surfaces as "reload the page".
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl BridgeHandle {
    async fn call(&self, request: BridgeRequest) -> Result<serde_json::Value, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .map_err(|_| RelayError::BridgeClosed)?;

        let response = reply_rx.await.map_err(|_| RelayError::BridgeClosed)?;

        if response.success {
            response
                .data
                .ok_or_else(|| RelayError::InvalidResponse("Empty bridge response".to_string()))
        } else {
            Err(RelayError::Reported(
                response
                    .error
                    .unwrap_or_else(|| "Unknown bridge error".to_string()),
            ))
        }
    }
}

#[async_trait]
impl RelayClient for BridgeHandle {
    async fn submit(&self, url: &PostUrl) -> Result<SubmitAck, RelayError> {
        let data = self
            .call(BridgeRequest::Share {
                url: url.as_str().to_string(),
            })
            .await?;
        serde_json::from_value(data)
            .map_err(|e| RelayError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn poll(&self, url: &PostUrl) -> Result<StatusReport, RelayError> {
        let data = self
            .call(BridgeRequest::CheckStatus {
                url: url.as_str().to_string(),
            })
            .await?;
        let status = data
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RelayError::InvalidResponse("Missing status field".to_string()))?;
        Ok(StatusReport {
            status: match status {
                "processing" => RemoteStatus::Processing,
                "completed" => RemoteStatus::Completed,
                "failed" => RemoteStatus::Failed,
                other => RemoteStatus::Unrecognized(other.to_string()),
            },
        })
    }

    async fn health(&self) -> Result<ServiceHealth, RelayError> {
        let data = self.call(BridgeRequest::Status).await?;
        serde_json::from_value(data)
            .map_err(|e| RelayError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}
