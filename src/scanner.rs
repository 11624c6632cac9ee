//! Page Scanner & Injector
//!
//! Discovers actionable post containers, resolves their canonical
//! identifiers through an ordered fallback chain, and injects exactly one
//! share control per eligible container. `scan` is idempotent and safely
//! re-entrant; re-running it on an unchanged document is a no-op.
//!
//! Rescans are driven by an explicit mutation feed rather than by the host
//! page: signals arrive on a channel and are coalesced in a debounce window
//! so a burst of page mutations (infinite scroll, re-render) costs one scan.

use crate::config::RescanPolicy;
use crate::document::{Container, Document, Placement, PostUrl, ShareControl};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

/// Counters from one scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Containers a locator strategy accepted
    pub candidates: usize,
    /// Controls injected by this pass
    pub injected: usize,
    /// Candidates skipped because they already hold a control
    pub already_injected: usize,
    /// Candidates skipped because no strategy yielded a permalink-shaped URL
    pub unresolvable: usize,
}

/// Scan the document and inject controls for newly eligible containers.
pub fn scan(document: &mut Document) -> ScanReport {
    let origin = document.origin.clone();
    let mut report = ScanReport::default();

    for container in document.containers_mut() {
        if !is_candidate(container) {
            continue;
        }
        report.candidates += 1;

        if container.has_control() {
            report.already_injected += 1;
            continue;
        }

        // Precision over recall: no permalink, no control.
        let Some(url) = resolve_post_url(container, &origin) else {
            report.unresolvable += 1;
            continue;
        };

        let placement = choose_placement(container);
        debug!(url = %url, ?placement, "Injecting share control");
        container.attach_control(Arc::new(ShareControl::new(url, placement)));
        report.injected += 1;
    }

    info!(
        candidates = report.candidates,
        injected = report.injected,
        already_injected = report.already_injected,
        unresolvable = report.unresolvable,
        "Scan pass finished"
    );
    report
}

/// Locator strategies in priority order: modern layout, legacy layout, then
/// a structural heuristic for containers neither recognized.
fn is_candidate(container: &Container) -> bool {
    if container.layout.is_some() {
        return true;
    }
    container.anchors.iter().any(|a| a.contains("/comments/"))
}

/// Ordered extraction fallback chain. First slot that canonicalizes into a
/// permalink-shaped URL wins.
fn resolve_post_url(container: &Container, origin: &str) -> Option<PostUrl> {
    if let Some(url) = container.full_post_link.as_deref().and_then(PostUrl::canonicalize) {
        return Some(url);
    }
    if let Some(url) = container.body_click_link.as_deref().and_then(PostUrl::canonicalize) {
        return Some(url);
    }
    if let Some(url) = container.anchors.iter().find_map(|a| PostUrl::canonicalize(a)) {
        return Some(url);
    }
    if let Some(url) = container.title_link.as_deref().and_then(PostUrl::canonicalize) {
        return Some(url);
    }
    if let Some(url) = container
        .legacy_title_link
        .as_deref()
        .and_then(PostUrl::canonicalize)
    {
        return Some(url);
    }
    if let Some(permalink) = container.data_permalink.as_deref() {
        return PostUrl::canonicalize(&format!("{}{}", origin, permalink));
    }
    None
}

/// Insertion strategies in priority order.
fn choose_placement(container: &Container) -> Placement {
    if container.has_action_bar {
        Placement::ActionBar
    } else if container.has_button_list {
        Placement::ButtonList
    } else {
        Placement::Appended
    }
}

/// One "the document changed" signal. Carries no payload; the scanner
/// re-reads the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSignal;

/// Producer half of the mutation feed.
#[derive(Clone)]
pub struct MutationFeed {
    tx: mpsc::UnboundedSender<MutationSignal>,
}

impl MutationFeed {
    /// Report a document mutation. Silently a no-op once the rescan loop is
    /// gone; a torn-down subscriber should not break the host page.
    pub fn notify(&self) {
        let _ = self.tx.send(MutationSignal);
    }
}

/// Subscribes to the mutation feed and rescans the shared document after
/// each coalesced burst.
pub struct Rescanner {
    document: Arc<Mutex<Document>>,
    policy: RescanPolicy,
}

impl Rescanner {
    pub fn new(document: Arc<Mutex<Document>>, policy: RescanPolicy) -> Self {
        Self { document, policy }
    }

    /// Create the feed and its receiving end.
    pub fn channel() -> (MutationFeed, mpsc::UnboundedReceiver<MutationSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MutationFeed { tx }, rx)
    }

    /// Run until the feed is dropped. Each iteration waits for one signal,
    /// coalesces followers inside the debounce window (or until the batch
    /// cap), then runs a single scan pass.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<MutationSignal>) {
        while rx.recv().await.is_some() {
            let mut coalesced = 1usize;
            loop {
                if coalesced >= self.policy.max_batch {
                    break;
                }
                match timeout(self.policy.debounce(), rx.recv()).await {
                    Ok(Some(MutationSignal)) => coalesced += 1,
                    // Feed dropped: run the final scan below, then stop.
                    Ok(None) => break,
                    Err(_) => break,
                }
            }

            debug!(coalesced, "Rescanning after mutation burst");
            scan(&mut self.document.lock());
        }
        debug!("Mutation feed closed; rescan loop stopping");
    }
}
