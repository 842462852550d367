// src/plan/pipeline.rs

//! Running an [`ExecutablePlan`] against a compiled pipeline.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::clean::clean;
use crate::config::ConfigFile;
use crate::engine::{
    CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, StageTracker, TriggerReason,
};
use crate::errors::{AssetdagError, Result};
use crate::exec::RealStageExecutor;
use crate::fs::FileSystem;
use crate::paths::PathTable;
use crate::plan::ExecutablePlan;
use crate::server::ReloadSink;
use crate::stage::{StageRunner, StageSet};
use crate::transform::TransformRegistry;
use crate::watch::{build_profiles, spawn_watcher};

/// Config, paths and compiled stages of one project.
#[derive(Debug)]
pub struct Pipeline {
    cfg: ConfigFile,
    paths: PathTable,
    stages: Arc<StageSet>,
    fs: Arc<dyn FileSystem>,
}

impl Pipeline {
    /// Resolve paths against `project_root` and compile every stage.
    pub fn from_config(
        cfg: ConfigFile,
        project_root: &Path,
        registry: &TransformRegistry,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let paths = PathTable::from_config(&cfg, project_root);
        let stages = StageSet::from_config(&cfg, &paths, registry)?;
        Ok(Self {
            cfg,
            paths,
            stages: Arc::new(stages),
            fs,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    /// Execute `plan`.
    ///
    /// 1. Start the watcher (watch plans), so no change made during the
    ///    initial build is missed.
    /// 2. Clean; a failure aborts before any stage runs.
    /// 3. Trigger every stage of the plan at once and drive the runtime.
    ///
    /// One-shot plans return once every stage is idle; if any stage failed
    /// the result is [`AssetdagError::BuildFailed`] naming all of them.
    /// Watch plans return after Ctrl-C.
    pub async fn execute(
        &self,
        plan: &ExecutablePlan,
        reloader: Arc<dyn ReloadSink>,
    ) -> Result<RunReport> {
        let stage_names = plan.stages();
        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64.max(stage_names.len() * 2));

        let _watcher_handle = if plan.watches() {
            let profiles = build_profiles(&self.paths, &stage_names, |name| {
                self.cfg.stage(name).is_some_and(|s| s.use_hash)
            })?;
            Some(spawn_watcher(
                self.paths.source_root(),
                profiles,
                rt_tx.clone(),
                Arc::clone(&self.fs),
                self.paths.output_root(),
            )?)
        } else {
            None
        };

        if plan.cleans() {
            clean(self.fs.as_ref(), self.paths.output_root())?;
        }

        if stage_names.is_empty() {
            info!(plan = ?plan.kind(), "no stages to run");
            return Ok(RunReport::default());
        }

        info!(stages = ?stage_names, "triggering stages");
        for stage in &stage_names {
            rt_tx
                .send(RuntimeEvent::StageTriggered {
                    stage: stage.clone(),
                    reason: TriggerReason::Initial,
                })
                .await
                .map_err(anyhow::Error::from)?;
        }

        {
            let tx = rt_tx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C received; shutting down");
                    let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
                }
            });
        }

        let one_shot = plan.kind().is_one_shot();
        let runner = Arc::new(StageRunner::new(Arc::clone(&self.fs), reloader));
        let executor = RealStageExecutor::new(Arc::clone(&self.stages), runner, rt_tx);
        let core = CoreRuntime::new(
            StageTracker::new(stage_names),
            RuntimeOptions {
                exit_when_idle: one_shot,
            },
        );

        let report = Runtime::new(core, rt_rx, executor).run().await?;

        let failed = report.failed();
        if one_shot && !failed.is_empty() {
            error!(failed = ?failed, "build finished with failures");
            return Err(AssetdagError::BuildFailed(failed));
        }

        info!(succeeded = ?report.succeeded(), "plan finished");
        Ok(report)
    }
}
