use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetdag::engine::{RuntimeEvent, ScheduledStage, StageOutcome};
use assetdag::errors::Result;
use assetdag::exec::StageExecutor;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which stages were "run"
/// - immediately reports `StageCompleted` for each scheduled stage,
///   failing the ones listed in `failing`.
pub struct FakeStageExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeStageExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, stage: &str) -> Self {
        self.failing.insert(stage.to_string());
        self
    }
}

impl StageExecutor for FakeStageExecutor {
    fn dispatch(
        &mut self,
        stages: Vec<ScheduledStage>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for s in stages {
                executed.lock().unwrap().push(s.name.clone());

                let outcome = if failing.contains(&s.name) {
                    StageOutcome::Failed(format!("{} failed", s.name))
                } else {
                    StageOutcome::Success { written: 1 }
                };

                tx.send(RuntimeEvent::StageCompleted {
                    stage: s.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
