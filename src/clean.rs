// src/clean.rs

use std::path::Path;

use tracing::{debug, info};

use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;

/// Recursively delete the output root.
///
/// A missing `root` is a successful no-op, so `clean` can run before the
/// very first build. Any failure (e.g. a file locked by another process) is
/// reported as [`AssetdagError::CleanFailure`], which aborts the whole plan.
pub fn clean(fs: &dyn FileSystem, root: &Path) -> Result<()> {
    if !fs.exists(root) {
        debug!(?root, "output root does not exist; nothing to clean");
        return Ok(());
    }

    fs.remove_dir_all(root)
        .map_err(|e| AssetdagError::CleanFailure {
            path: root.to_path_buf(),
            cause: format!("{e:#}"),
        })?;

    info!(?root, "cleaned output root");
    Ok(())
}
