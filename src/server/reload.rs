// src/server/reload.rs

//! Reload notifications from stages to connected browsers.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::StageName;
use crate::watch::path_utils::slash_str;

/// SSE event telling clients to reload the page.
pub const RELOAD_EVENT: &str = "reload";

/// SSE event telling clients to re-fetch stylesheets only.
pub const CSS_EVENT: &str = "css";

/// Files a stage just (re)wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub stage: StageName,
    pub paths: Vec<PathBuf>,
}

impl ReloadEvent {
    /// Render as newline-separated URL paths relative to `output_root`.
    ///
    /// A path outside the served tree (e.g. a `target = "source"` stage)
    /// becomes `*`, which makes clients do a full reload.
    pub fn to_message(&self, output_root: &Path) -> String {
        self.paths
            .iter()
            .map(|p| match p.strip_prefix(output_root) {
                Ok(rel) => format!("/{}", slash_str(rel)),
                Err(_) => "*".to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True if every changed file is a stylesheet, so clients can swap CSS
    /// in place instead of reloading.
    pub fn is_css_only(&self) -> bool {
        !self.paths.is_empty()
            && self
                .paths
                .iter()
                .all(|p| p.extension().is_some_and(|e| e == "css"))
    }

    /// SSE event name: [`CSS_EVENT`] for stylesheet-only changes,
    /// [`RELOAD_EVENT`] otherwise.
    pub fn event_name(&self) -> &'static str {
        if self.is_css_only() {
            CSS_EVENT
        } else {
            RELOAD_EVENT
        }
    }
}

/// Receives a notification after every successful stage run.
pub trait ReloadSink: Send + Sync + Debug {
    fn notify_reload(&self, event: ReloadEvent);
}

/// Fans reload events out to every connected dev-server client.
#[derive(Debug, Clone)]
pub struct BroadcastReloader {
    tx: broadcast::Sender<ReloadEvent>,
}

impl BroadcastReloader {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastReloader {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ReloadSink for BroadcastReloader {
    fn notify_reload(&self, event: ReloadEvent) {
        let stage = event.stage.clone();
        match self.tx.send(event) {
            Ok(clients) => debug!(stage = %stage, clients, "reload broadcast"),
            Err(_) => debug!(stage = %stage, "reload broadcast with no clients connected"),
        }
    }
}

/// Discards reload notifications (one-shot plans have no server).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReloader;

impl ReloadSink for NoopReloader {
    fn notify_reload(&self, _event: ReloadEvent) {}
}
