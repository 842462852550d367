// src/transform/include.rs

//! Built-in `include` transform.
//!
//! Resolves `@@include('path')` / `@@include("path")` directives, relative to
//! the file containing the directive, recursively. An optional second
//! argument (a JSON context, as in `@@include('x.html', {"a": 1})`) is
//! accepted and ignored.

use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use tracing::trace;

use super::{Transform, TransformContext, TransformFuture};
use crate::fs::FileSystem;

pub const INCLUDE_TRANSFORM: &str = "include";

/// Nesting limit; deeper chains are almost certainly a mistake.
const MAX_INCLUDE_DEPTH: usize = 32;

const INCLUDE_PATTERN: &str =
    r#"@@include\(\s*(?:'([^']+)'|"([^"]+)")\s*(?:,\s*\{[^)]*\}\s*)?\)"#;

#[derive(Debug, Clone)]
pub struct IncludeTransform {
    directive: Regex,
}

impl IncludeTransform {
    pub fn new() -> Result<Self> {
        let directive = Regex::new(INCLUDE_PATTERN).context("compiling @@include pattern")?;
        Ok(Self { directive })
    }

    /// Expand every directive in `text`, which was read from `file`.
    ///
    /// `stack` holds the chain of files currently being expanded and is used
    /// for cycle detection.
    fn expand(
        &self,
        fs: &dyn FileSystem,
        text: &str,
        file: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String> {
        if stack.len() > MAX_INCLUDE_DEPTH {
            bail!("includes nested deeper than {MAX_INCLUDE_DEPTH} levels at {:?}", file);
        }

        let base = file.parent().unwrap_or_else(|| Path::new(""));
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.directive.captures_iter(text) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2)))
            else {
                continue;
            };

            let path = normalize(&base.join(target.as_str()));
            if stack.contains(&path) {
                bail!("include cycle: {:?} includes {:?} again", file, path);
            }

            trace!(from = ?file, include = ?path, "resolving include");
            let included = fs
                .read_to_string(&path)
                .with_context(|| format!("including {:?} from {:?}", target.as_str(), file))?;

            stack.push(path.clone());
            let expanded = self.expand(fs, &included, &path, stack)?;
            stack.pop();

            out.push_str(&text[last..whole.start()]);
            out.push_str(&expanded);
            last = whole.end();
        }

        out.push_str(&text[last..]);
        Ok(out)
    }
}

impl Transform for IncludeTransform {
    fn name(&self) -> &str {
        INCLUDE_TRANSFORM
    }

    fn apply<'a>(&'a self, ctx: TransformContext<'a>, input: Vec<u8>) -> TransformFuture<'a> {
        Box::pin(async move {
            let text = String::from_utf8(input)
                .map_err(|e| anyhow!("{:?} is not valid UTF-8: {}", ctx.source, e))?;
            let mut stack = vec![ctx.source.to_path_buf()];
            let expanded = self.expand(ctx.fs, &text, ctx.source, &mut stack)?;
            Ok(expanded.into_bytes())
        })
    }
}

/// Lexically resolve `.` and `..` so one file always has one name.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir if !out.as_os_str().is_empty() => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
