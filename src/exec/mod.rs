// src/exec/mod.rs

//! Stage execution layer.
//!
//! This module is responsible for actually running the stages the core
//! schedules and reporting back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`stage_task`] runs a single stage and reports its outcome.
//! - [`backend`] provides the `StageExecutor` trait and the concrete
//!   `RealStageExecutor` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod stage_task;

pub use backend::{RealStageExecutor, StageExecutor};
pub use stage_task::run_stage;
