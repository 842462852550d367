// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::engine::core::RunReport;
use crate::engine::tracker::{ScheduledStage, StageTracker};
use crate::engine::{RuntimeOptions, StageOutcome, TriggerReason};
use crate::types::StageName;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these stages to the executor.
    DispatchStages(Vec<ScheduledStage>),
    /// Request that the runtime exits (one-shot plans, once idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Handle a stage trigger event.
///
/// An idle stage is dispatched immediately. A running stage is marked
/// pending; any number of further triggers collapse into that one re-run.
pub fn handle_stage_trigger(
    tracker: &mut StageTracker,
    stage: StageName,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    tracing::debug!(stage = %stage, ?reason, "stage triggered");
    if let Some(scheduled) = tracker.handle_trigger(&stage) {
        commands.push(CoreCommand::DispatchStages(vec![scheduled]));
    }

    CoreStep {
        commands,
        keep_running: true,
    }
}

/// Handle a stage completion event.
///
/// Failures are recorded and never retried on their own; only a new
/// trigger (or one that arrived during the run) starts another run.
pub fn handle_stage_completion(
    tracker: &mut StageTracker,
    report: &mut RunReport,
    options: &RuntimeOptions,
    stage: StageName,
    outcome: StageOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    report.record(&stage, outcome);

    if let Some(scheduled) = tracker.handle_completion(&stage) {
        commands.push(CoreCommand::DispatchStages(vec![scheduled]));
    }

    let mut keep_running = true;
    if options.exit_when_idle && tracker.is_idle() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
