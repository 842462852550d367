// src/engine/mod.rs

//! Orchestration engine for assetdag.
//!
//! This module ties together:
//! - the per-stage run tracker (one run at a time, coalesced re-runs)
//! - the main runtime event loop that reacts to:
//!   - initial triggers from the selected plan
//!   - file-watch triggers
//!   - stage completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::types::StageName;

/// Result of one stage run, as reported to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// All files transformed and written.
    Success { written: usize },
    /// The stage aborted; carries the rendered error.
    Failed(String),
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success { .. })
    }
}

/// Why a stage was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Seeded by the plan at startup.
    Initial,
    /// Triggered due to a filesystem event.
    FileWatch,
    /// Triggered programmatically (tests, tooling).
    Manual,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once every stage is idle with nothing
    /// pending (one-shot plans such as `build`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from watchers, executors, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A stage should run (or re-run once its current run finishes).
    StageTriggered {
        stage: StageName,
        reason: TriggerReason,
    },
    /// A stage run finished with a concrete outcome.
    StageCompleted {
        stage: StageName,
        outcome: StageOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod tracker;

pub use core::{CoreRuntime, RunReport};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
pub use tracker::{ScheduledStage, StageRunState, StageTracker};
