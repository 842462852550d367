// src/transform/command.rs

//! External-command transform.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Transform, TransformContext, TransformFuture};

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";
const SOURCE_PLACEHOLDER: &str = "{source}";
const SOURCE_DIR_PLACEHOLDER: &str = "{source_dir}";

/// Runs a shell command over the input bytes.
///
/// - Without placeholders the bytes go to stdin and the result is stdout.
/// - `{input}` switches input to a temp file (stdin is closed).
/// - `{output}` switches output to a temp file (stdout is ignored).
///
/// A non-zero exit is an error carrying the exit code and stderr.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    name: String,
    cmd: String,
    output_extension: Option<String>,
}

impl CommandTransform {
    pub fn new(
        name: impl Into<String>,
        cmd: impl Into<String>,
        output_extension: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            output_extension,
        }
    }

    async fn run(&self, ctx: TransformContext<'_>, input: Vec<u8>) -> Result<Vec<u8>> {
        let uses_input = self.cmd.contains(INPUT_PLACEHOLDER);
        let uses_output = self.cmd.contains(OUTPUT_PLACEHOLDER);

        let source_dir = ctx.source.parent().unwrap_or_else(|| Path::new("."));
        let mut cmd_line = self
            .cmd
            .replace(SOURCE_DIR_PLACEHOLDER, &shell_quote(source_dir))
            .replace(SOURCE_PLACEHOLDER, &shell_quote(ctx.source));

        // Kept alive until the command has finished; dropping removes it.
        let scratch = if uses_input || uses_output {
            Some(tempfile::tempdir().context("creating scratch dir for transform")?)
        } else {
            None
        };

        let source_ext = ctx
            .source
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        let mut output_path: Option<PathBuf> = None;
        if let Some(dir) = &scratch {
            if uses_input {
                let path = dir.path().join(file_name("input", source_ext.as_deref()));
                tokio::fs::write(&path, &input)
                    .await
                    .with_context(|| format!("writing transform input {:?}", path))?;
                cmd_line = cmd_line.replace(INPUT_PLACEHOLDER, &shell_quote(&path));
            }
            if uses_output {
                let ext = self.output_extension.as_deref().or(source_ext.as_deref());
                let path = dir.path().join(file_name("output", ext));
                cmd_line = cmd_line.replace(OUTPUT_PLACEHOLDER, &shell_quote(&path));
                output_path = Some(path);
            }
        }

        debug!(
            transform = %self.name,
            stage = %ctx.stage,
            source = ?ctx.source,
            cmd = %cmd_line,
            "running transform command"
        );

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&cmd_line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&cmd_line);
            c
        };

        cmd.stdin(if uses_input { Stdio::null() } else { Stdio::piped() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning `{cmd_line}`"))?;

        // Feed stdin from a separate task so a command that writes a lot of
        // output before reading all input cannot deadlock against us.
        if let Some(mut stdin) = child.stdin.take() {
            let name = self.name.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    warn!(transform = %name, error = %e, "failed to write transform stdin");
                }
            });
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for `{cmd_line}`"))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` exited with code {}: {}",
                cmd_line,
                code,
                stderr.trim()
            );
        }

        match output_path {
            Some(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading transform output {:?}", path)),
            None => Ok(output.stdout),
        }
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, ctx: TransformContext<'a>, input: Vec<u8>) -> TransformFuture<'a> {
        Box::pin(self.run(ctx, input))
    }
}

fn file_name(stem: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem.to_string(),
    }
}

/// Quote a path for the platform shell.
fn shell_quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}
