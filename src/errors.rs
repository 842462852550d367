// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Clean failed for {path:?}: {cause}")]
    CleanFailure { path: PathBuf, cause: String },

    #[error("Stage '{stage}' failed on {file:?}: {cause}")]
    StageFailure {
        stage: String,
        file: PathBuf,
        cause: String,
    },

    #[error("Build failed; stages with errors: {}", .0.join(", "))]
    BuildFailed(Vec<String>),

    #[error("Unknown stage: {0}")]
    StageNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
