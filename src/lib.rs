//! Outpost: Client-Side Share Orchestration
//!
//! The orchestration core behind a feed-page "share" button: a privileged
//! relay that performs HTTP calls to a local automation service on behalf of
//! a sandboxed page context, a scanner that injects one stateful control per
//! eligible post, and a bounded-retry polling state machine that tracks each
//! submission to a terminal outcome.

pub mod bridge;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod relay;
pub mod scanner;
