//! Configuration for the share orchestration core.
//!
//! Plain in-process structs with serde defaults and environment variable
//! overrides. Nothing here is persisted; hosts construct these once and hand
//! them to the components that need them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the local automation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the automation service (loopback only)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8765".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServiceConfig {
    /// Build a config from defaults, honoring the `OUTPOST_SERVICE_URL`
    /// environment variable when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("OUTPOST_SERVICE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim_end_matches('/').to_string();
            }
        }
        config
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Timing and bounds for the status-polling state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay before the first status poll, in milliseconds. The service has
    /// usually not started work yet; polling immediately is wasted traffic.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Delay between consecutive polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Maximum number of poll attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long a failed control stays in its failed look before reverting
    /// to idle, in milliseconds
    #[serde(default = "default_failure_cooldown_ms")]
    pub failure_cooldown_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    2_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    120
}

fn default_failure_cooldown_ms() -> u64 {
    5_000
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            failure_cooldown_ms: default_failure_cooldown_ms(),
        }
    }
}

impl PollPolicy {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }
}

/// Coalescing policy for mutation-driven rescans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescanPolicy {
    /// Quiet window after the last mutation signal before a rescan runs,
    /// in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Signals coalesced into one rescan regardless of quiet time; a burst
    /// longer than this triggers a rescan immediately
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_max_batch() -> usize {
    100
}

impl Default for RescanPolicy {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_batch: default_max_batch(),
        }
    }
}

impl RescanPolicy {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
