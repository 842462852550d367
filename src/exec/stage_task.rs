// src/exec/stage_task.rs

//! Individual stage run.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RuntimeEvent, ScheduledStage, StageOutcome};
use crate::stage::{Stage, StageRunner};

/// Run one scheduled stage and report a `StageCompleted` event.
///
/// A failure is logged here with its file and cause and handed to the core
/// as `StageOutcome::Failed`; it is never retried.
pub async fn run_stage(
    scheduled: ScheduledStage,
    stage: Arc<Stage>,
    runner: Arc<StageRunner>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(stage = %scheduled.name, run_id = scheduled.run_id, "running stage");

    let outcome = match runner.run(&stage).await {
        Ok(report) => StageOutcome::Success {
            written: report.written.len(),
        },
        Err(err) => {
            error!(
                stage = %err.stage,
                run_id = scheduled.run_id,
                file = ?err.file,
                error = %err,
                "stage failed"
            );
            StageOutcome::Failed(err.to_string())
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::StageCompleted {
            stage: scheduled.name.clone(),
            outcome,
        })
        .await
    {
        warn!(stage = %scheduled.name, "failed to send StageCompleted: {err}");
    }
}
