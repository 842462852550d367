// src/paths.rs

//! Path table: where each asset class reads from, watches, and writes to.
//!
//! Pure data derived once from the validated config. Every `Output` stage's
//! directory sits beneath the single output root (enforced by
//! `config::validate`), which is what makes `clean` complete.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ConfigFile;
use crate::errors::{AssetdagError, Result};
use crate::types::{StageName, StageTarget};

/// Paths for a single asset class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub asset_class: StageName,
    /// Directory that `source_patterns` / `watch_patterns` are relative to.
    pub source_root: PathBuf,
    pub source_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub watch_patterns: Vec<String>,
    /// Fully resolved directory artifacts are written under.
    pub output_dir: PathBuf,
    pub target: StageTarget,
}

#[derive(Debug, Clone)]
pub struct PathTable {
    source_root: PathBuf,
    output_root: PathBuf,
    specs: BTreeMap<StageName, PathSpec>,
}

impl PathTable {
    /// Resolve every stage's paths against `project_root` (the config file's
    /// directory).
    pub fn from_config(cfg: &ConfigFile, project_root: &Path) -> Self {
        let source_root = project_root.join(&cfg.config.source_dir);
        let output_root = project_root.join(&cfg.config.output_dir);

        let specs = cfg
            .stages()
            .iter()
            .map(|(name, stage)| {
                let target_root = project_root.join(stage.target_root(&cfg.config));
                let output_dir = if stage.out.as_os_str().is_empty() {
                    target_root
                } else {
                    target_root.join(&stage.out)
                };
                let spec = PathSpec {
                    asset_class: name.clone(),
                    source_root: source_root.clone(),
                    source_patterns: stage.src.clone(),
                    exclude_patterns: stage.exclude.clone(),
                    watch_patterns: stage.watch.clone(),
                    output_dir,
                    target: stage.target,
                };
                (name.clone(), spec)
            })
            .collect();

        Self {
            source_root,
            output_root,
            specs,
        }
    }

    /// Look up the paths for an asset class.
    ///
    /// An unknown class is a configuration error: stage names all come from
    /// the same validated config, so this only fires on programming mistakes.
    pub fn get(&self, asset_class: &str) -> Result<&PathSpec> {
        self.specs.get(asset_class).ok_or_else(|| {
            AssetdagError::ConfigError(format!("no paths configured for asset class '{asset_class}'"))
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSpec> {
        self.specs.values()
    }
}
