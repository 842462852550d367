//! In-process stand-ins for external transforms and the reload channel.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use assetdag::server::{ReloadEvent, ReloadSink};
use assetdag::transform::{Transform, TransformContext, TransformFuture};

/// Uppercases ASCII.
#[derive(Debug, Clone)]
pub struct UppercaseTransform {
    name: String,
}

impl UppercaseTransform {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Transform for UppercaseTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, _ctx: TransformContext<'a>, input: Vec<u8>) -> TransformFuture<'a> {
        Box::pin(async move { Ok(input.to_ascii_uppercase()) })
    }
}

/// Appends a fixed suffix, so chain order is visible in the output.
#[derive(Debug, Clone)]
pub struct SuffixTransform {
    name: String,
    suffix: String,
}

impl SuffixTransform {
    pub fn new(name: &str, suffix: &str) -> Self {
        Self {
            name: name.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

impl Transform for SuffixTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, _ctx: TransformContext<'a>, mut input: Vec<u8>) -> TransformFuture<'a> {
        Box::pin(async move {
            input.extend_from_slice(self.suffix.as_bytes());
            Ok(input)
        })
    }
}

/// Fails for every input whose bytes contain `marker`.
#[derive(Debug, Clone)]
pub struct FailingTransform {
    name: String,
    marker: String,
}

impl FailingTransform {
    pub fn new(name: &str, marker: &str) -> Self {
        Self {
            name: name.to_string(),
            marker: marker.to_string(),
        }
    }
}

impl Transform for FailingTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, ctx: TransformContext<'a>, input: Vec<u8>) -> TransformFuture<'a> {
        Box::pin(async move {
            let text = String::from_utf8_lossy(&input);
            if text.contains(self.marker.as_str()) {
                return Err(anyhow!("syntax error in {:?}", ctx.source));
            }
            Ok(input)
        })
    }
}

/// Records every reload notification.
#[derive(Debug, Clone, Default)]
pub struct RecordingReloader {
    events: Arc<Mutex<Vec<ReloadEvent>>>,
}

impl RecordingReloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReloadEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.stage).collect()
    }
}

impl ReloadSink for RecordingReloader {
    fn notify_reload(&self, event: ReloadEvent) {
        self.events.lock().unwrap().push(event);
    }
}
