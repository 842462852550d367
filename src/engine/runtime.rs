// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::tracker::ScheduledStage;
use crate::errors::Result;
use crate::exec::StageExecutor;

use super::core::{CoreRuntime, RunReport};
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Async shell around [`CoreRuntime`]: pulls events off the channel and
/// forwards dispatched stages to a `StageExecutor`.
pub struct Runtime<E: StageExecutor> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: StageExecutor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: StageExecutor> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Drain events until the core asks to stop or every sender is gone,
    /// then hand back the latest outcome of each stage that ran.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("assetdag runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            let CoreStep {
                commands,
                keep_running,
            } = self.core.step(event);

            for command in commands {
                if let CoreCommand::DispatchStages(stages) = command {
                    self.dispatch(stages).await?;
                }
            }

            if !keep_running {
                info!(
                    succeeded = self.core.report().succeeded().len(),
                    failed = self.core.report().failed().len(),
                    "stopping runtime"
                );
                return Ok(self.core.into_report());
            }
        }

        info!("runtime event channel closed; exiting");
        Ok(self.core.into_report())
    }

    async fn dispatch(&mut self, stages: Vec<ScheduledStage>) -> Result<()> {
        if stages.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        let run_ids: Vec<_> = stages.iter().map(|s| s.run_id).collect();
        debug!(?names, ?run_ids, "dispatching stages");

        self.executor.dispatch(stages).await
    }
}
