//! Submission Orchestrator
//!
//! Per-control logic invoked on user activation. Owns the in-flight guard
//! set, drives the relay client, and runs the bounded polling state machine
//! that keeps the control's visual state honest:
//!
//! `Idle → Sending → RemoteProcessing → {Completed | Failed | TimedOut}`
//!
//! Every transition touches at most the guard set, the control state, and
//! the schedule for the next poll. Nothing here scans documents or makes
//! network calls outside its own identifier.

use crate::config::PollPolicy;
use crate::document::{ControlState, PostUrl, ShareControl};
use crate::error::{RelayError, ShareError};
use crate::relay::{RelayClient, RemoteStatus};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How one submission cycle ended.
#[derive(Debug)]
pub enum ShareOutcome {
    /// A cycle for this identifier was already running; nothing was done.
    AlreadyInFlight,
    /// The service finished processing the post.
    Completed,
    /// The cycle ended in a user-visible failure.
    Failed(ShareError),
    /// The poll bound was exhausted while the service kept processing.
    TimedOut,
    /// Polling stopped without a terminal answer (unrecognized status or a
    /// transport failure mid-poll). The control keeps its processing look.
    Frozen,
}

/// Drives submission cycles and owns the guard set.
///
/// The guard set is an explicit member, never ambient state, so the machine
/// is testable without a live page. Check-and-insert happens under one lock
/// before the first suspension point, which is what makes two racing
/// activations of the same identifier collapse into one submit.
pub struct Orchestrator {
    relay: Arc<dyn RelayClient>,
    policy: PollPolicy,
    in_flight: Mutex<HashSet<PostUrl>>,
}

impl Orchestrator {
    pub fn new(relay: Arc<dyn RelayClient>, policy: PollPolicy) -> Self {
        Self {
            relay,
            policy,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Whether a submission cycle currently owns this identifier.
    pub fn is_in_flight(&self, url: &PostUrl) -> bool {
        self.in_flight.lock().contains(url)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Run one submission cycle for the control, from user activation to a
    /// terminal (or frozen) outcome.
    pub async fn activate(&self, control: &Arc<ShareControl>) -> ShareOutcome {
        let url = control.url().clone();

        // Guard check-and-insert is a single locked step with no await in
        // between; a second activation for the same identifier can never
        // slip past it.
        if !self.in_flight.lock().insert(url.clone()) {
            debug!(url = %url, "Activation ignored: submission already in flight");
            return ShareOutcome::AlreadyInFlight;
        }

        control.set_state(ControlState::Sending);
        info!(url = %url, "Submitting post to automation service");

        match self.relay.submit(&url).await {
            Ok(ack) if ack.is_success() => {
                control.set_state(ControlState::RemoteProcessing);
                self.poll_until_terminal(control, &url).await
            }
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| format!("Service answered '{}'", ack.status));
                self.fail(control, &url, ShareError::Rejected(message), true)
            }
            Err(RelayError::BridgeClosed) => self.fail(control, &url, ShareError::BridgeLost, false),
            Err(e) => self.fail(control, &url, ShareError::Transport(e), true),
        }
    }

    /// Bounded poll loop. Polls for one identifier are strictly sequential:
    /// the next one is scheduled only after the previous resolved.
    async fn poll_until_terminal(&self, control: &Arc<ShareControl>, url: &PostUrl) -> ShareOutcome {
        sleep(self.policy.initial_delay()).await;

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.relay.poll(url).await {
                Ok(report) => match report.status {
                    RemoteStatus::Completed => {
                        self.release(url);
                        control.set_state(ControlState::Completed);
                        info!(url = %url, attempts, "Post shared");
                        return ShareOutcome::Completed;
                    }
                    RemoteStatus::Failed => {
                        return self.fail(
                            control,
                            url,
                            ShareError::Rejected("The service could not share this post".to_string()),
                            true,
                        );
                    }
                    RemoteStatus::Processing => {
                        if attempts >= self.policy.max_attempts {
                            // Releasing the guard here is deliberate: a
                            // timed-out post must stay resubmittable.
                            self.release(url);
                            control.set_state(ControlState::TimedOut);
                            warn!(url = %url, attempts, "Gave up polling; post may still complete remotely");
                            return ShareOutcome::TimedOut;
                        }
                        sleep(self.policy.interval()).await;
                    }
                    RemoteStatus::Unrecognized(raw) => {
                        // Conservative freeze: an answer we cannot interpret
                        // means the service is misbehaving, and hammering it
                        // with more polls will not help. Guard retained.
                        warn!(url = %url, status = %raw, "Unrecognized status; polling stops");
                        return ShareOutcome::Frozen;
                    }
                },
                Err(RelayError::BridgeClosed) => {
                    return self.fail(control, url, ShareError::BridgeLost, false);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Status check failed; polling stops");
                    return ShareOutcome::Frozen;
                }
            }
        }
    }

    /// Terminal failure: release the guard, surface the message, and (for
    /// retryable failures) schedule the cool-down reset back to idle.
    ///
    /// Bridge loss is not retryable without reinitializing the bridge, so it
    /// keeps its failed look and reload instruction instead of auto-resetting.
    fn fail(
        &self,
        control: &Arc<ShareControl>,
        url: &PostUrl,
        error: ShareError,
        auto_reset: bool,
    ) -> ShareOutcome {
        self.release(url);
        warn!(url = %url, error = %error, "Submission cycle failed");
        control.fail(error.user_message());

        if auto_reset {
            let control = Arc::clone(control);
            let cooldown = self.policy.failure_cooldown();
            tokio::spawn(async move {
                sleep(cooldown).await;
                control.reset_if_failed();
            });
        }

        ShareOutcome::Failed(error)
    }

    fn release(&self, url: &PostUrl) {
        self.in_flight.lock().remove(url);
    }
}
