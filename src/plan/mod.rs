// src/plan/mod.rs

//! Named plans (`build`, `watch`, `clean`, single stage) and their
//! execution.
//!
//! - [`graph`] is the petgraph-backed task graph with its validation.
//! - [`builder`] turns a plan name into an [`ExecutablePlan`].
//! - [`pipeline`] runs a plan: watcher, clean, then the stage runtime.

pub mod builder;
pub mod graph;
pub mod pipeline;

pub use builder::{build_plan, ExecutablePlan};
pub use graph::{EdgeKind, PlanNode, TaskGraph};
pub use pipeline::Pipeline;
