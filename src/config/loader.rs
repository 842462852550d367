// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Built-in pipeline used when no config file exists.
///
/// This is the same file shipped at the repository root, so the documented
/// example and the fallback can never drift apart.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../Assetdag.toml");

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_raw(&contents)
}

/// Parse TOML text into a `RawConfigFile`.
pub fn parse_raw(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks globs, transform references and output containment.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`default_pipeline`].
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        return load_and_validate(path);
    }
    info!(
        "config file {:?} not found; using the built-in default pipeline",
        path
    );
    default_pipeline()
}

/// The built-in markup/styles/scripts/images/fonts pipeline.
pub fn default_pipeline() -> Result<ConfigFile> {
    ConfigFile::try_from(parse_raw(DEFAULT_CONFIG_TOML)?)
}

/// Helper to resolve a default config path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetdag.toml")
}
