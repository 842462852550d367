// src/stage/sources.rs

//! Resolving a stage's source globs into concrete files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobMatcher, GlobSet};

use crate::fs::FileSystem;
use crate::watch::path_utils::slash_str;
use crate::watch::patterns::{build_glob, build_globset};

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Full path of the file (source root joined with its relative path).
    pub path: PathBuf,
    /// Path below the literal base of the glob that matched it. Artifacts
    /// are written at this path beneath the stage's output directory.
    pub relative: PathBuf,
}

#[derive(Debug, Clone)]
struct SourcePattern {
    matcher: GlobMatcher,
    base: String,
}

/// Compiled `src` globs minus `exclude` globs.
#[derive(Debug, Clone)]
pub struct SourceSet {
    patterns: Vec<SourcePattern>,
    exclude: GlobSet,
}

/// The literal directory prefix of a glob (`img/**/*.png` -> `img`).
///
/// A pattern without any glob syntax names a single file, so its base is
/// the file's directory (`scss/style.scss` -> `scss`).
pub fn glob_base(pattern: &str) -> String {
    let parts: Vec<&str> = pattern.split('/').collect();
    let literal = parts
        .iter()
        .take_while(|p| !p.contains(['*', '?', '[', '{']))
        .count();
    let keep = if literal == parts.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };
    parts[..keep].join("/")
}

impl SourceSet {
    pub fn new(src: &[String], exclude: &[String]) -> Result<Self> {
        let patterns = src
            .iter()
            .map(|p| {
                Ok(SourcePattern {
                    matcher: build_glob(p)?.compile_matcher(),
                    base: glob_base(p),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let exclude = build_globset(exclude)?;
        Ok(Self { patterns, exclude })
    }

    /// The relative path below the base of the first matching pattern, or
    /// `None` if `rel` is not a source of this set.
    pub fn match_relative(&self, rel: &str) -> Option<PathBuf> {
        if self.exclude.is_match(rel) {
            return None;
        }
        self.patterns
            .iter()
            .find(|p| p.matcher.is_match(rel))
            .map(|p| {
                let stripped = if p.base.is_empty() {
                    rel
                } else {
                    rel.strip_prefix(&p.base)
                        .map(|r| r.trim_start_matches('/'))
                        .unwrap_or(rel)
                };
                PathBuf::from(stripped)
            })
    }

    /// Every file under `root` selected by this set, sorted by path.
    ///
    /// A missing `root` yields no files rather than an error.
    pub fn resolve(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        if !fs.is_dir(root) {
            return Ok(files);
        }

        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let entries = fs
                .read_dir(&dir)
                .with_context(|| format!("listing sources in {:?}", dir))?;
            for path in entries {
                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }
                if !fs.is_file(&path) {
                    continue;
                }
                let Ok(rel) = path.strip_prefix(root) else {
                    continue;
                };
                if let Some(relative) = self.match_relative(&slash_str(rel)) {
                    files.push(SourceFile { path, relative });
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
