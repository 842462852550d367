// src/engine/tracker.rs

//! Per-stage run state: the single-run-at-a-time lock with coalesced
//! re-runs.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::types::StageName;

/// Internal state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    /// Running, and at least one trigger arrived since the run started.
    /// All such triggers collapse into a single follow-up run.
    RunningWithPending,
}

/// Public, read-only view of a stage's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRunState {
    Idle,
    Running,
    RunningWithPending,
}

impl From<RunState> for StageRunState {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Idle => StageRunState::Idle,
            RunState::Running => StageRunState::Running,
            RunState::RunningWithPending => StageRunState::RunningWithPending,
        }
    }
}

#[derive(Debug, Clone)]
struct StageInfo {
    state: RunState,
    runs_started: u64,
}

/// Description of a stage the core wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStage {
    pub name: StageName,
    /// Monotonically increasing across all stages.
    pub run_id: u64,
}

/// Tracks every stage that can be dispatched by the current plan.
#[derive(Debug, Clone)]
pub struct StageTracker {
    stages: BTreeMap<StageName, StageInfo>,
    next_run_id: u64,
}

impl StageTracker {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StageName>,
    {
        let stages = names
            .into_iter()
            .map(|n| {
                (
                    n.into(),
                    StageInfo {
                        state: RunState::Idle,
                        runs_started: 0,
                    },
                )
            })
            .collect();
        Self {
            stages,
            next_run_id: 1,
        }
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(|s| s.as_str())
    }

    /// `None` for stages that are not part of this plan.
    pub fn run_state_of(&self, stage: &str) -> Option<StageRunState> {
        self.stages.get(stage).map(|i| i.state.into())
    }

    /// Number of runs dispatched for `stage` so far.
    pub fn runs_started(&self, stage: &str) -> u64 {
        self.stages.get(stage).map(|i| i.runs_started).unwrap_or(0)
    }

    /// True when no stage is running or has a pending re-run.
    pub fn is_idle(&self) -> bool {
        self.stages.values().all(|i| i.state == RunState::Idle)
    }

    /// Record a trigger. Returns the stage to dispatch, if it was idle.
    pub fn handle_trigger(&mut self, stage: &str) -> Option<ScheduledStage> {
        let Some(info) = self.stages.get_mut(stage) else {
            warn!(stage = %stage, "trigger for a stage outside this plan; ignoring");
            return None;
        };

        match info.state {
            RunState::Idle => {
                info.state = RunState::Running;
                info.runs_started += 1;
                let run_id = self.next_run_id;
                self.next_run_id += 1;
                info!(stage = %stage, run_id, "starting stage");
                Some(ScheduledStage {
                    name: stage.to_string(),
                    run_id,
                })
            }
            RunState::Running => {
                info.state = RunState::RunningWithPending;
                debug!(stage = %stage, "stage busy; re-run queued");
                None
            }
            RunState::RunningWithPending => {
                debug!(stage = %stage, "stage busy; re-run already queued");
                None
            }
        }
    }

    /// Record a completion. Returns the follow-up run, if one was pending.
    pub fn handle_completion(&mut self, stage: &str) -> Option<ScheduledStage> {
        let Some(info) = self.stages.get_mut(stage) else {
            warn!(stage = %stage, "completion for a stage outside this plan; ignoring");
            return None;
        };

        match info.state {
            RunState::Idle => {
                warn!(stage = %stage, "completion for an idle stage; ignoring");
                None
            }
            RunState::Running => {
                info.state = RunState::Idle;
                None
            }
            RunState::RunningWithPending => {
                info.state = RunState::Running;
                info.runs_started += 1;
                let run_id = self.next_run_id;
                self.next_run_id += 1;
                info!(stage = %stage, run_id, "re-running stage for changes seen during the last run");
                Some(ScheduledStage {
                    name: stage.to_string(),
                    run_id,
                })
            }
        }
    }
}
