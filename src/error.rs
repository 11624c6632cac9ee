//! Error types for the share orchestration core.

use thiserror::Error;

/// Transport-level errors produced by the relay client.
///
/// Every failure mode of a single HTTP round trip (or of the message-bus hop
/// in front of it) collapses into one of these variants so callers see a
/// uniform result shape regardless of where the call broke down.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Could not reach automation service: {0}")]
    ConnectionFailed(String),

    #[error("Request to automation service timed out: {0}")]
    Timeout(String),

    #[error("Automation service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid response from automation service: {0}")]
    InvalidResponse(String),

    #[error("Bridge to the privileged context is closed")]
    BridgeClosed,

    #[error("Relay call failed: {0}")]
    Reported(String),
}

/// Invalid configuration handed to an init function.
#[derive(Debug, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

/// Orchestrator-level errors surfaced on a share control.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Transport failure: {0}")]
    Transport(#[from] RelayError),

    #[error("Automation service rejected the post: {0}")]
    Rejected(String),

    #[error("Connection to the background helper was lost; reload the page")]
    BridgeLost,

    #[error("Gave up waiting for the post to finish processing")]
    TimedOut,
}

impl ShareError {
    /// Message shown on the control when this error ends a submission cycle.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
