// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to a `StageExecutor` instead of running stages itself.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production implementation here.
//!
//! - `RealStageExecutor` runs each scheduled stage on its own Tokio task,
//!   so every dispatched stage runs concurrently with the others.
//! - Tests can provide their own `StageExecutor` that, for example, records
//!   which stages were scheduled and directly emits `StageCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::engine::{RuntimeEvent, ScheduledStage, StageOutcome};
use crate::errors::Result;
use crate::stage::{StageRunner, StageSet};

use super::stage_task::run_stage;

/// Trait abstracting how scheduled stages are executed.
pub trait StageExecutor: Send {
    /// Dispatch the given stages for execution.
    ///
    /// Every dispatched stage must eventually produce exactly one
    /// `RuntimeEvent::StageCompleted`.
    fn dispatch(
        &mut self,
        stages: Vec<ScheduledStage>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealStageExecutor {
    stages: Arc<StageSet>,
    runner: Arc<StageRunner>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealStageExecutor {
    pub fn new(
        stages: Arc<StageSet>,
        runner: Arc<StageRunner>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            stages,
            runner,
            runtime_tx,
        }
    }
}

impl StageExecutor for RealStageExecutor {
    fn dispatch(
        &mut self,
        stages: Vec<ScheduledStage>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for scheduled in stages {
                let Some(stage) = self.stages.get(&scheduled.name) else {
                    warn!(stage = %scheduled.name, "dispatched stage is not compiled");
                    self.runtime_tx
                        .send(RuntimeEvent::StageCompleted {
                            stage: scheduled.name.clone(),
                            outcome: StageOutcome::Failed(format!(
                                "unknown stage '{}'",
                                scheduled.name
                            )),
                        })
                        .await
                        .map_err(anyhow::Error::from)?;
                    continue;
                };

                tokio::spawn(run_stage(
                    scheduled,
                    stage,
                    Arc::clone(&self.runner),
                    self.runtime_tx.clone(),
                ));
            }
            Ok(())
        })
    }
}
