// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledStage`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use std::collections::BTreeMap;

use crate::engine::event_handlers::{handle_stage_completion, handle_stage_trigger, CoreStep};
use crate::engine::tracker::StageTracker;
use crate::engine::{RuntimeEvent, RuntimeOptions, StageOutcome};
use crate::types::StageName;

/// Latest outcome of every stage that completed at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    outcomes: BTreeMap<StageName, StageOutcome>,
}

impl RunReport {
    pub fn record(&mut self, stage: &str, outcome: StageOutcome) {
        self.outcomes.insert(stage.to_string(), outcome);
    }

    pub fn outcome_of(&self, stage: &str) -> Option<&StageOutcome> {
        self.outcomes.get(stage)
    }

    /// Stages whose latest run succeeded, sorted by name.
    pub fn succeeded(&self) -> Vec<StageName> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_success())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Stages whose latest run failed, sorted by name.
    pub fn failed(&self) -> Vec<StageName> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(StageOutcome::is_success)
    }
}

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    tracker: StageTracker,
    options: RuntimeOptions,
    report: RunReport,
}

impl CoreRuntime {
    pub fn new(tracker: StageTracker, options: RuntimeOptions) -> Self {
        Self {
            tracker,
            options,
            report: RunReport::default(),
        }
    }

    /// Expose whether every stage is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.tracker.is_idle()
    }

    pub fn tracker(&self) -> &StageTracker {
        &self.tracker
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::StageTriggered { stage, reason } => {
                handle_stage_trigger(&mut self.tracker, stage, reason)
            }
            RuntimeEvent::StageCompleted { stage, outcome } => handle_stage_completion(
                &mut self.tracker,
                &mut self.report,
                &self.options,
                stage,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
