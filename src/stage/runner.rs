// src/stage/runner.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::server::reload::{ReloadEvent, ReloadSink};
use crate::stage::{Stage, StageError, StageErrorKind, StageReport};
use crate::transform::{apply_chain, TransformContext};

/// Where an artifact for `relative` lands beneath `output_dir`.
///
/// The file stem is kept and the extension replaced (`style.scss` with
/// `min.css` -> `style.min.css`); without an extension the source's own
/// file name is used.
pub fn artifact_path(output_dir: &Path, relative: &Path, extension: Option<&str>) -> PathBuf {
    let dest = output_dir.join(relative);
    match extension {
        None => dest,
        Some(ext) => {
            let stem = relative
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            dest.with_file_name(format!("{stem}.{ext}"))
        }
    }
}

/// Executes stages against a filesystem and reports successful runs to a
/// reload sink.
#[derive(Debug, Clone)]
pub struct StageRunner {
    fs: Arc<dyn FileSystem>,
    reload: Arc<dyn ReloadSink>,
}

impl StageRunner {
    pub fn new(fs: Arc<dyn FileSystem>, reload: Arc<dyn ReloadSink>) -> Self {
        Self { fs, reload }
    }

    /// Run `stage` once over its current sources.
    ///
    /// Files are processed in path order. For each file the stage chain runs
    /// once and its result feeds every artifact's own chain; artifacts are
    /// written in declaration order, so a later artifact with the same path
    /// replaces an earlier one. The first error aborts the stage and no
    /// reload is announced.
    pub async fn run(&self, stage: &Stage) -> Result<StageReport, StageError> {
        let fs = self.fs.as_ref();
        let source_root = &stage.paths.source_root;

        let sources = stage
            .sources
            .resolve(fs, source_root)
            .map_err(|cause| StageError {
                stage: stage.name.clone(),
                file: source_root.clone(),
                kind: StageErrorKind::Resolve,
                cause,
            })?;

        debug!(stage = %stage.name, count = sources.len(), "resolved sources");

        let mut written = Vec::new();
        for source in &sources {
            let fail = |kind, cause| StageError {
                stage: stage.name.clone(),
                file: source.path.clone(),
                kind,
                cause,
            };

            let input = fs
                .read(&source.path)
                .map_err(|e| fail(StageErrorKind::Read, e))?;

            let ctx = TransformContext {
                stage: &stage.name,
                source: &source.path,
                fs,
            };

            let expanded = apply_chain(&stage.chain, ctx, input)
                .await
                .map_err(|e| fail(StageErrorKind::Transform, e))?;

            for artifact in &stage.artifacts {
                let bytes = apply_chain(&artifact.chain, ctx, expanded.clone())
                    .await
                    .map_err(|e| fail(StageErrorKind::Transform, e))?;

                let dest = artifact_path(
                    &stage.paths.output_dir,
                    &source.relative,
                    artifact.extension.as_deref(),
                );
                fs.write(&dest, &bytes)
                    .map_err(|e| fail(StageErrorKind::Write, e))?;
                debug!(stage = %stage.name, dest = ?dest, bytes = bytes.len(), "wrote artifact");
                written.push(dest);
            }
        }

        info!(
            stage = %stage.name,
            inputs = sources.len(),
            written = written.len(),
            "stage finished"
        );

        self.reload.notify_reload(ReloadEvent {
            stage: stage.name.clone(),
            paths: written.clone(),
        });

        Ok(StageReport {
            stage: stage.name.clone(),
            inputs: sources.len(),
            written,
        })
    }
}
