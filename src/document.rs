//! Abstract page model.
//!
//! The scanner does not touch a real DOM. Hosts adapt whatever rendered
//! surface they have into a [`Document`] of [`Container`]s carrying the link
//! slots and insertion regions the strategies consult. Controls injected here
//! are shared with the orchestrator, which drives their visual state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Canonical identifier for a shareable post.
///
/// A query-stripped permalink URL. Construction only succeeds for
/// permalink-shaped URLs (containing `/comments/`); anything else is not a
/// shareable item and gets no control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostUrl(String);

impl PostUrl {
    /// Canonicalize a raw URL into a stable identifier.
    ///
    /// Strips everything from the first `?` or `#` so that re-scans of the
    /// same underlying item (with or without tracking parameters) resolve to
    /// the same key.
    pub fn canonicalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let without_query = trimmed.split(['?', '#']).next().unwrap_or("");
        if !without_query.contains("/comments/") {
            return None;
        }
        Some(Self(without_query.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Page layout a locator strategy recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    Modern,
    Legacy,
}

/// Where an injected control ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Primary slot in the post's action bar
    ActionBar,
    /// Legacy flat button list
    ButtonList,
    /// Generic fallback append at the end of the container
    Appended,
}

/// Visual state of a share control, projected from the submission state
/// machine. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlState {
    Idle,
    Sending,
    RemoteProcessing,
    Completed,
    Failed,
    TimedOut,
}

impl ControlState {
    /// Human label rendered on the control.
    pub fn label(self) -> &'static str {
        match self {
            ControlState::Idle => "Share",
            ControlState::Sending => "Sending…",
            ControlState::RemoteProcessing => "Processing…",
            ControlState::Completed => "Shared!",
            ControlState::Failed => "Failed",
            ControlState::TimedOut => "Timed out",
        }
    }

    /// Terminal states accept no further automatic transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ControlState::Completed | ControlState::Failed | ControlState::TimedOut
        )
    }
}

/// The per-item interactive affordance.
///
/// One control per eligible container, bound to its canonical [`PostUrl`].
/// State lives behind a mutex because the orchestrator updates it from async
/// tasks while the host reads it to render.
#[derive(Debug)]
pub struct ShareControl {
    url: PostUrl,
    placement: Placement,
    state: Mutex<ControlState>,
    message: Mutex<Option<String>>,
}

impl ShareControl {
    pub fn new(url: PostUrl, placement: Placement) -> Self {
        Self {
            url,
            placement,
            state: Mutex::new(ControlState::Idle),
            message: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &PostUrl {
        &self.url
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn state(&self) -> ControlState {
        *self.state.lock()
    }

    pub fn label(&self) -> &'static str {
        self.state().label()
    }

    /// Most recent user-facing failure message, if any.
    pub fn message(&self) -> Option<String> {
        self.message.lock().clone()
    }

    pub(crate) fn set_state(&self, state: ControlState) {
        *self.state.lock() = state;
    }

    pub(crate) fn fail(&self, message: String) {
        *self.state.lock() = ControlState::Failed;
        *self.message.lock() = Some(message);
    }

    /// Revert a failed control to idle after its cool-down. No-op if the
    /// state moved on in the meantime (e.g. a fresh activation).
    pub(crate) fn reset_if_failed(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ControlState::Failed {
            *state = ControlState::Idle;
            *self.message.lock() = None;
            true
        } else {
            false
        }
    }
}

/// One candidate post container observed on the page.
///
/// Field names follow the slots the extraction chain consults, in the order
/// it consults them. Hosts fill whichever slots their layout actually has.
#[derive(Debug, Default)]
pub struct Container {
    /// Layout the locator recognized; `None` means the container was picked
    /// up by the structural heuristic only.
    pub layout: Option<Layout>,

    /// Modern layout: dedicated full-post link slot
    pub full_post_link: Option<String>,
    /// Modern layout: body click-target link
    pub body_click_link: Option<String>,
    /// All anchors in the container; the heuristic scans these for a
    /// permalink-shaped href
    pub anchors: Vec<String>,
    /// Modern layout: post title node href
    pub title_link: Option<String>,
    /// Legacy layout: title anchor
    pub legacy_title_link: Option<String>,
    /// Legacy layout: site-relative permalink attribute
    pub data_permalink: Option<String>,

    /// Whether the container exposes a primary action-bar region
    pub has_action_bar: bool,
    /// Whether the container exposes a legacy flat button list
    pub has_button_list: bool,

    pub control: Option<Arc<ShareControl>>,
}

impl Container {
    pub fn new(layout: Option<Layout>) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    /// Idempotency check: a container that already holds a control is
    /// skipped by subsequent scans.
    pub fn has_control(&self) -> bool {
        self.control.is_some()
    }

    pub fn control(&self) -> Option<&Arc<ShareControl>> {
        self.control.as_ref()
    }

    pub(crate) fn attach_control(&mut self, control: Arc<ShareControl>) {
        self.control = Some(control);
    }
}

/// The rendered feed as the scanner sees it.
#[derive(Debug)]
pub struct Document {
    /// Origin prefixed onto site-relative permalink attributes
    pub origin: String,
    containers: Vec<Container>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            origin: "https://www.reddit.com".to_string(),
            containers: Vec::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            containers: Vec::new(),
        }
    }

    pub fn push(&mut self, container: Container) {
        self.containers.push(container);
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn containers_mut(&mut self) -> &mut [Container] {
        &mut self.containers
    }

    /// All controls injected so far, in document order.
    pub fn controls(&self) -> Vec<Arc<ShareControl>> {
        self.containers
            .iter()
            .filter_map(|c| c.control().cloned())
            .collect()
    }
}
