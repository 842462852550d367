// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::paths::PathTable;
use crate::types::StageName;

/// Compiled watch globs for a single stage: one watch binding.
///
/// Patterns are relative to the source root. The watcher passes relative
/// paths (e.g. `"scss/_vars.scss"`) into `matches`. A binding always
/// triggers exactly the one stage it belongs to.
#[derive(Clone)]
pub struct StageWatchProfile {
    name: StageName,
    watch_set: GlobSet,
    use_hash: bool,
}

impl fmt::Debug for StageWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageWatchProfile")
            .field("name", &self.name)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl StageWatchProfile {
    pub fn new(name: impl Into<StageName>, patterns: &[String], use_hash: bool) -> Result<Self> {
        let name = name.into();
        let watch_set = build_globset(patterns)
            .with_context(|| format!("building watch globset for stage {name}"))?;
        Ok(Self {
            name,
            watch_set,
            use_hash,
        })
    }

    /// Name of the stage this binding triggers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this stage uses content hashing (`use_hash = true`).
    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Returns true if a change at `rel_path` (relative to the source root)
    /// should re-run this stage.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path)
    }
}

/// Compile one glob with the separator semantics used everywhere in
/// assetdag: `*` stays within a directory, `**` crosses directories.
pub fn build_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(build_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// One profile per stage that is watched.
///
/// Stages with no `watch` patterns, and stages outside the `build` set
/// (`stages` lists the ones that are running), get no binding.
pub fn build_profiles(
    paths: &PathTable,
    stages: &[StageName],
    use_hash: impl Fn(&str) -> bool,
) -> Result<Vec<StageWatchProfile>> {
    let mut profiles = Vec::new();
    for spec in paths.iter() {
        if spec.watch_patterns.is_empty() || !stages.contains(&spec.asset_class) {
            continue;
        }
        profiles.push(StageWatchProfile::new(
            spec.asset_class.clone(),
            &spec.watch_patterns,
            use_hash(&spec.asset_class),
        )?);
    }
    Ok(profiles)
}

/// Collect all files under `root` that match this stage's watch patterns.
///
/// This is used by the watcher when computing aggregated hashes for
/// `use_hash = true` stages. The result is sorted by path.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &StageWatchProfile,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if profile.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
