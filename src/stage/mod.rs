// src/stage/mod.rs

//! Transform stages: one per asset class.
//!
//! A stage resolves its sources, runs each file through the stage chain,
//! then writes one file per artifact variant. Stages are independent of
//! each other; the only ordering in a plan is `clean` before all stages.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ConfigFile;
use crate::errors::{AssetdagError, Result};
use crate::paths::{PathSpec, PathTable};
use crate::transform::{Transform, TransformRegistry};
use crate::types::StageName;

pub mod runner;
pub mod sources;

pub use runner::{artifact_path, StageRunner};
pub use sources::{glob_base, SourceFile, SourceSet};

/// One output variant of a stage.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Replacement extension; `None` keeps the source file's name.
    pub extension: Option<String>,
    /// Applied to the stage chain's result.
    pub chain: Vec<Arc<dyn Transform>>,
}

/// A compiled stage, ready to run.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: StageName,
    pub paths: PathSpec,
    pub sources: SourceSet,
    pub chain: Vec<Arc<dyn Transform>>,
    pub artifacts: Vec<Artifact>,
}

/// Every stage of a config, by name.
#[derive(Debug, Clone, Default)]
pub struct StageSet {
    stages: BTreeMap<StageName, Arc<Stage>>,
}

impl StageSet {
    pub fn from_config(
        cfg: &ConfigFile,
        paths: &PathTable,
        registry: &TransformRegistry,
    ) -> Result<Self> {
        let mut stages = BTreeMap::new();
        for (name, stage_cfg) in cfg.stages() {
            let spec = paths.get(name)?.clone();
            let sources = SourceSet::new(&spec.source_patterns, &spec.exclude_patterns)
                .map_err(|e| AssetdagError::ConfigError(format!("stage '{name}': {e:#}")))?;
            let chain = registry.resolve_chain(&stage_cfg.chain)?;
            let artifacts = stage_cfg
                .artifacts
                .iter()
                .map(|a| {
                    Ok(Artifact {
                        extension: a.extension.clone(),
                        chain: registry.resolve_chain(&a.chain)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            stages.insert(
                name.clone(),
                Arc::new(Stage {
                    name: name.clone(),
                    paths: spec,
                    sources,
                    chain,
                    artifacts,
                }),
            );
        }
        Ok(Self { stages })
    }

    pub fn get(&self, name: &str) -> Option<Arc<Stage>> {
        self.stages.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Which step of a stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageErrorKind {
    Resolve,
    Read,
    Transform,
    Write,
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageErrorKind::Resolve => "resolving sources in",
            StageErrorKind::Read => "reading",
            StageErrorKind::Transform => "transforming",
            StageErrorKind::Write => "writing",
        };
        f.write_str(s)
    }
}

/// A stage aborted on one file.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed {kind} {file:?}: {cause:#}")]
pub struct StageError {
    pub stage: StageName,
    pub file: PathBuf,
    pub kind: StageErrorKind,
    pub cause: anyhow::Error,
}

impl From<StageError> for AssetdagError {
    fn from(err: StageError) -> Self {
        AssetdagError::StageFailure {
            stage: err.stage,
            file: err.file,
            cause: format!("{:#}", err.cause),
        }
    }
}

/// What a successful stage run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub stage: StageName,
    /// Number of source files processed.
    pub inputs: usize,
    /// Every file written, in write order.
    pub written: Vec<PathBuf>,
}
