//! End-to-end submission flows: scanner → orchestrator → bridge → HTTP.
//!
//! Runs the real stack against an httpmock stand-in for the automation
//! service, with fast poll timings so the tests stay quick under real time.

use httpmock::prelude::*;
use outpost::bridge::BridgeServer;
use outpost::config::{PollPolicy, ServiceConfig};
use outpost::document::{Container, ControlState, Document, Layout, Placement};
use outpost::orchestrator::{Orchestrator, ShareOutcome};
use outpost::relay::{HttpRelayClient, RelayClient};
use outpost::scanner::scan;
use std::sync::Arc;
use std::time::Duration;

const POST_URL: &str = "https://www.reddit.com/r/rust/comments/abc123/title/";

fn fast_policy() -> PollPolicy {
    PollPolicy {
        initial_delay_ms: 10,
        interval_ms: 10,
        max_attempts: 120,
        failure_cooldown_ms: 50,
    }
}

fn relay_for(server: &MockServer) -> Arc<dyn RelayClient> {
    let config = ServiceConfig {
        base_url: server.base_url(),
        ..Default::default()
    };
    Arc::new(HttpRelayClient::new(&config).unwrap())
}

fn scanned_document() -> Document {
    let mut document = Document::new();
    document.push(Container {
        layout: Some(Layout::Modern),
        full_post_link: Some(format!("{}?ref=share", POST_URL)),
        has_action_bar: true,
        ..Default::default()
    });
    let report = scan(&mut document);
    assert_eq!(report.injected, 1);
    document
}

#[tokio::test]
async fn test_full_share_flow_completes() {
    let server = MockServer::start_async().await;
    let submit_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/share")
            .json_body(serde_json::json!({ "url": POST_URL }));
        then.status(200)
            .json_body(serde_json::json!({"status": "success", "message": "URL queued for processing"}));
    });
    let check_mock = server.mock(|when, then| {
        when.method(GET).path_includes("/check/");
        then.status(200)
            .json_body(serde_json::json!({"url": POST_URL, "status": "completed"}));
    });

    let (bridge, handle) = BridgeServer::new(relay_for(&server));
    tokio::spawn(bridge.run());

    let document = scanned_document();
    let control = document.controls().remove(0);
    // Scan canonicalized the tracking-parameter variant down to the key the
    // service sees.
    assert_eq!(control.url().as_str(), POST_URL);
    assert_eq!(control.placement(), Placement::ActionBar);

    let orchestrator = Orchestrator::new(Arc::new(handle), fast_policy());
    let outcome = orchestrator.activate(&control).await;

    assert!(matches!(outcome, ShareOutcome::Completed));
    assert_eq!(control.state(), ControlState::Completed);
    assert!(!orchestrator.is_in_flight(control.url()));
    submit_mock.assert();
    check_mock.assert();
}

#[tokio::test]
async fn test_http_500_submit_fails_and_recovers() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/share");
        then.status(500)
            .json_body(serde_json::json!({"status": "error", "message": "selenium crashed"}));
    });

    let (bridge, handle) = BridgeServer::new(relay_for(&server));
    tokio::spawn(bridge.run());

    let document = scanned_document();
    let control = document.controls().remove(0);
    let orchestrator = Orchestrator::new(Arc::new(handle), fast_policy());

    let outcome = orchestrator.activate(&control).await;

    // A 500 with a JSON body is a transport failure, never RemoteProcessing.
    assert!(matches!(outcome, ShareOutcome::Failed(_)));
    assert_eq!(control.state(), ControlState::Failed);
    assert!(!orchestrator.is_in_flight(control.url()));

    // After the cool-down the control is retryable again.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(control.state(), ControlState::Idle);
}

#[tokio::test]
async fn test_remote_rejection_surfaces_service_message() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/share");
        then.status(200)
            .json_body(serde_json::json!({"status": "error", "message": "Invalid Reddit URL"}));
    });

    let (bridge, handle) = BridgeServer::new(relay_for(&server));
    tokio::spawn(bridge.run());

    let document = scanned_document();
    let control = document.controls().remove(0);
    let orchestrator = Orchestrator::new(Arc::new(handle), fast_policy());

    let outcome = orchestrator.activate(&control).await;

    assert!(matches!(outcome, ShareOutcome::Failed(_)));
    assert!(control.message().unwrap().contains("Invalid Reddit URL"));
}

#[tokio::test]
async fn test_remote_failure_during_polling() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/share");
        then.status(200)
            .json_body(serde_json::json!({"status": "success"}));
    });
    server.mock(|when, then| {
        when.method(GET).path_includes("/check/");
        then.status(200)
            .json_body(serde_json::json!({"url": POST_URL, "status": "failed"}));
    });

    let (bridge, handle) = BridgeServer::new(relay_for(&server));
    tokio::spawn(bridge.run());

    let document = scanned_document();
    let control = document.controls().remove(0);
    let orchestrator = Orchestrator::new(Arc::new(handle), fast_policy());

    let outcome = orchestrator.activate(&control).await;

    assert!(matches!(outcome, ShareOutcome::Failed(_)));
    assert!(!orchestrator.is_in_flight(control.url()));
}

#[tokio::test]
async fn test_health_check_through_bridge() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/status");
        then.status(200)
            .json_body(serde_json::json!({"status": "running", "queue_size": 3}));
    });

    let (bridge, handle) = BridgeServer::new(relay_for(&server));
    tokio::spawn(bridge.run());

    let health = handle.health().await.unwrap();
    assert_eq!(health.status, "running");
    assert_eq!(health.queue_size, 3);
}
