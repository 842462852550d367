// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to the built-in pipeline
//!   (`loader.rs`).
//! - Validate invariants such as output containment and transform
//!   references (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_pipeline, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ArtifactConfig, ConfigFile, ConfigSection, RawConfigFile, StageConfig, TransformConfig,
};
