// src/config/validate.rs

use std::path::{Component, Path};

use crate::config::model::{ConfigFile, RawConfigFile, StageConfig};
use crate::errors::{AssetdagError, Result};
use crate::transform::BUILTIN_TRANSFORMS;
use crate::types::StageTarget;
use crate::watch::patterns::build_globset;

/// Stage names that would collide with plan names on the command line.
pub const RESERVED_STAGE_NAMES: &[&str] = &["build", "watch", "clean", "default"];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.transform, raw.stage))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_stages(cfg)?;
    validate_global_config(cfg)?;
    validate_transforms(cfg)?;
    for (name, stage) in cfg.stage.iter() {
        validate_stage(cfg, name, stage)?;
    }
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetdagError {
    AssetdagError::ConfigError(msg.into())
}

fn ensure_has_stages(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(config_error(
            "config must contain at least one [stage.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.config;

    if section.port == 0 {
        return Err(config_error("[config].port must be >= 1 (got 0)"));
    }

    if !is_contained_relative(&section.output_dir) || is_empty_path(&section.output_dir) {
        return Err(config_error(format!(
            "[config].output_dir must be a non-empty relative path without '..' (got {:?})",
            section.output_dir
        )));
    }

    if !is_contained_relative(&section.source_dir) {
        return Err(config_error(format!(
            "[config].source_dir must be a relative path without '..' (got {:?})",
            section.source_dir
        )));
    }

    // `clean` deletes the whole output tree, so it must never contain sources.
    let output = normalized(&section.output_dir);
    let source = normalized(&section.source_dir);
    if source.starts_with(&output) {
        return Err(config_error(format!(
            "[config].output_dir {:?} must not contain source_dir {:?}",
            section.output_dir, section.source_dir
        )));
    }

    Ok(())
}

fn validate_transforms(cfg: &RawConfigFile) -> Result<()> {
    for (name, transform) in cfg.transform.iter() {
        if BUILTIN_TRANSFORMS.contains(&name.as_str()) {
            return Err(config_error(format!(
                "transform '{name}' shadows a built-in transform"
            )));
        }
        if transform.cmd.trim().is_empty() {
            return Err(config_error(format!(
                "transform '{name}' has an empty `cmd`"
            )));
        }
    }
    Ok(())
}

fn validate_stage(cfg: &RawConfigFile, name: &str, stage: &StageConfig) -> Result<()> {
    if name.trim().is_empty() {
        return Err(config_error("stage names must not be empty"));
    }
    if RESERVED_STAGE_NAMES.contains(&name) {
        return Err(config_error(format!(
            "stage name '{name}' is reserved for a plan"
        )));
    }

    if stage.src.is_empty() {
        return Err(config_error(format!(
            "stage '{name}' must declare at least one `src` pattern"
        )));
    }

    for (field, patterns) in [
        ("src", &stage.src),
        ("exclude", &stage.exclude),
        ("watch", &stage.watch),
    ] {
        build_globset(patterns).map_err(|e| {
            config_error(format!("stage '{name}' has an invalid `{field}` glob: {e:#}"))
        })?;
    }

    if !is_contained_relative(&stage.out) {
        let root = match stage.target {
            StageTarget::Output => "output_dir",
            StageTarget::Source => "source_dir",
        };
        return Err(config_error(format!(
            "stage '{name}' has `out` {:?} outside of {root}",
            stage.out
        )));
    }

    for transform in stage.referenced_transforms() {
        let known = BUILTIN_TRANSFORMS.contains(&transform)
            || cfg.transform.contains_key(transform);
        if !known {
            return Err(config_error(format!(
                "stage '{name}' references unknown transform '{transform}'"
            )));
        }
    }

    if stage.artifacts.is_empty() {
        return Err(config_error(format!(
            "stage '{name}' must declare at least one [[artifact]]"
        )));
    }

    for artifact in stage.artifacts.iter() {
        if let Some(ext) = &artifact.extension {
            let bad = ext.is_empty()
                || ext.starts_with('.')
                || ext.contains('/')
                || ext.contains('\\');
            if bad {
                return Err(config_error(format!(
                    "stage '{name}' has invalid artifact extension {ext:?} (use e.g. \"min.css\")"
                )));
            }
        }
    }

    Ok(())
}

/// True if `path` is relative and never climbs above its root.
fn is_contained_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn is_empty_path(path: &Path) -> bool {
    !path.components().any(|c| matches!(c, Component::Normal(_)))
}

fn normalized(path: &Path) -> std::path::PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}
