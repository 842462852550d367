// src/plan/builder.rs

use crate::config::ConfigFile;
use crate::errors::{AssetdagError, Result};
use crate::plan::graph::{EdgeKind, PlanNode, TaskGraph};
use crate::types::{PlanKind, StageName};

/// A validated task graph for one named plan.
#[derive(Debug, Clone)]
pub struct ExecutablePlan {
    kind: PlanKind,
    graph: TaskGraph,
}

impl ExecutablePlan {
    pub fn kind(&self) -> &PlanKind {
        &self.kind
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Whether the output root is deleted before any stage starts.
    pub fn cleans(&self) -> bool {
        self.graph.contains(PlanNode::Clean)
    }

    /// Stages the plan runs, sorted by name.
    pub fn stages(&self) -> Vec<StageName> {
        let mut names = self.graph.stage_names().to_vec();
        names.sort();
        names
    }

    pub fn watches(&self) -> bool {
        self.graph.contains(PlanNode::Watch)
    }

    pub fn serves(&self) -> bool {
        self.graph.contains(PlanNode::Serve)
    }
}

/// Build the task graph for `kind`.
///
/// - `build`: clean, then every `in_build` stage concurrently.
/// - `watch`: `build`, plus the watch loop (re-triggering those stages) and
///   the dev server, all concurrent.
/// - `clean`: clean alone.
/// - a stage name: that stage alone, without clean.
pub fn build_plan(cfg: &ConfigFile, kind: PlanKind) -> Result<ExecutablePlan> {
    let mut graph = TaskGraph::new();

    match &kind {
        PlanKind::Clean => {
            graph.add_node(PlanNode::Clean);
        }
        PlanKind::Build | PlanKind::Watch => {
            let clean = graph.add_node(PlanNode::Clean);
            let stages: Vec<PlanNode> = cfg
                .build_stage_names()
                .into_iter()
                .map(|name| graph.add_stage(name))
                .collect();
            for &stage in &stages {
                graph.add_edge(clean, stage, EdgeKind::Before);
            }

            if kind == PlanKind::Watch {
                let watch = graph.add_node(PlanNode::Watch);
                graph.add_node(PlanNode::Serve);
                for &stage in &stages {
                    let name = graph.stage_name(stage).unwrap_or_default().to_string();
                    let watched = cfg.stage(&name).is_some_and(|s| !s.watch.is_empty());
                    if watched {
                        graph.add_edge(watch, stage, EdgeKind::Concurrent);
                    }
                }
            }
        }
        PlanKind::Stage(name) => {
            if cfg.stage(name).is_none() {
                return Err(AssetdagError::StageNotFound(name.clone()));
            }
            graph.add_stage(name.clone());
        }
    }

    graph
        .validate()
        .map_err(|e| AssetdagError::ConfigError(format!("{e:#}")))?;
    Ok(ExecutablePlan { kind, graph })
}
