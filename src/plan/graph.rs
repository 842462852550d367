// src/plan/graph.rs

//! Task graph of a plan.
//!
//! Nodes are `clean`, the stages, the watch loop and the dev server. The
//! only ordering edges run from `clean` to stages; stages never depend on
//! each other.

use anyhow::{anyhow, Result};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::types::StageName;

/// A node in the plan. Stages are referenced by index into
/// [`TaskGraph::stage_names`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlanNode {
    Clean,
    Stage(usize),
    Watch,
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Source must finish before target starts.
    Before,
    /// Source feeds target while both run (watch loop -> stage).
    Concurrent,
}

#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    graph: DiGraphMap<PlanNode, EdgeKind>,
    stages: Vec<StageName>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: PlanNode) -> PlanNode {
        self.graph.add_node(node)
    }

    pub fn add_stage(&mut self, name: impl Into<StageName>) -> PlanNode {
        let name = name.into();
        let idx = match self.stages.iter().position(|s| *s == name) {
            Some(idx) => idx,
            None => {
                self.stages.push(name);
                self.stages.len() - 1
            }
        };
        self.graph.add_node(PlanNode::Stage(idx))
    }

    pub fn add_edge(&mut self, from: PlanNode, to: PlanNode, kind: EdgeKind) {
        self.graph.add_edge(from, to, kind);
    }

    pub fn contains(&self, node: PlanNode) -> bool {
        self.graph.contains_node(node)
    }

    pub fn edge(&self, from: PlanNode, to: PlanNode) -> Option<EdgeKind> {
        self.graph.edge_weight(from, to).copied()
    }

    pub fn stage_names(&self) -> &[StageName] {
        &self.stages
    }

    pub fn stage_name(&self, node: PlanNode) -> Option<&str> {
        match node {
            PlanNode::Stage(idx) => self.stages.get(idx).map(|s| s.as_str()),
            _ => None,
        }
    }

    /// Human-readable name of a node.
    pub fn label(&self, node: PlanNode) -> String {
        match node {
            PlanNode::Clean => "clean".to_string(),
            PlanNode::Stage(_) => self.stage_name(node).unwrap_or("?").to_string(),
            PlanNode::Watch => "watch".to_string(),
            PlanNode::Serve => "serve".to_string(),
        }
    }

    /// Reject stage -> stage edges and cycles.
    pub fn validate(&self) -> Result<()> {
        for (from, to, _) in self.graph.all_edges() {
            if matches!(from, PlanNode::Stage(_)) && matches!(to, PlanNode::Stage(_)) {
                return Err(anyhow!(
                    "stages must be independent, but '{}' is ordered before '{}'",
                    self.label(from),
                    self.label(to)
                ));
            }
        }

        match toposort(&self.graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(anyhow!(
                "cycle detected in plan involving '{}'",
                self.label(cycle.node_id())
            )),
        }
    }

    /// Group nodes into layers by `Before` edges: every node in layer *k*
    /// only waits for nodes in earlier layers. Nodes in one layer run
    /// concurrently.
    pub fn execution_layers(&self) -> Vec<Vec<PlanNode>> {
        let mut remaining: Vec<PlanNode> = self.graph.nodes().collect();
        remaining.sort();
        let mut done: Vec<PlanNode> = Vec::new();
        let mut layers = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<PlanNode>, Vec<PlanNode>) =
                remaining.into_iter().partition(|node| {
                    self.graph
                        .neighbors_directed(*node, Direction::Incoming)
                        .filter(|from| self.edge(*from, *node) == Some(EdgeKind::Before))
                        .all(|from| done.contains(&from))
                });

            // Only reachable with a cycle; `validate` reports those.
            if ready.is_empty() {
                layers.push(blocked);
                break;
            }

            done.extend(ready.iter().copied());
            layers.push(ready);
            remaining = blocked;
        }

        layers
    }
}
