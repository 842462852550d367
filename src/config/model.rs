// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{StageName, StageTarget};

/// Top-level configuration exactly as deserialized from TOML.
///
/// ```toml
/// [config]
/// source_dir = "src"
/// output_dir = "dist"
/// port = 3030
///
/// [transform.clean_css]
/// cmd = "npx --no-install cleancss"
///
/// [stage.styles]
/// src = ["scss/style.scss"]
/// watch = ["scss/**/*.scss"]
/// out = "css"
/// chain = ["sass"]
///
/// [[stage.styles.artifact]]
/// extension = "css"
///
/// [[stage.styles.artifact]]
/// extension = "min.css"
/// chain = ["clean_css"]
/// ```
///
/// Nothing here has been validated yet; convert to [`ConfigFile`] with
/// `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// External transforms from `[transform.<name>]`.
    #[serde(default)]
    pub transform: BTreeMap<String, TransformConfig>,

    /// Stages (one per asset class) from `[stage.<name>]`.
    #[serde(default)]
    pub stage: BTreeMap<StageName, StageConfig>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on every invariant checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    transform: BTreeMap<String, TransformConfig>,
    stage: BTreeMap<StageName, StageConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        transform: BTreeMap<String, TransformConfig>,
        stage: BTreeMap<StageName, StageConfig>,
    ) -> Self {
        Self {
            config,
            transform,
            stage,
        }
    }

    pub fn transforms(&self) -> &BTreeMap<String, TransformConfig> {
        &self.transform
    }

    pub fn stages(&self) -> &BTreeMap<StageName, StageConfig> {
        &self.stage
    }

    pub fn stage(&self, name: &str) -> Option<&StageConfig> {
        self.stage.get(name)
    }

    /// Names of the stages that participate in `build` (`in_build = true`).
    pub fn build_stage_names(&self) -> Vec<StageName> {
        self.stage
            .iter()
            .filter(|(_, s)| s.in_build)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Root of the source tree, relative to the config file's directory.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Root of the build output; deleted wholesale by `clean`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Dev server port (the server binds on `host`).
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_port() -> u16 {
    3030
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            port: default_port(),
            host: default_host(),
        }
    }
}

/// `[transform.<name>]` section: an external command.
///
/// The command runs through the platform shell. By default the input bytes
/// are piped to stdin and the result is read from stdout. Placeholders:
///
/// - `{input}`: path of a temp file holding the input bytes (stdin is closed)
/// - `{output}`: path of a temp file the command writes; read instead of stdout
/// - `{source}` / `{source_dir}`: the original source file and its directory
#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    pub cmd: String,

    /// Extension for the `{output}` temp file, for tools that pick the
    /// output format from the file name (e.g. `"ttf"`).
    #[serde(default)]
    pub output_extension: Option<String>,
}

/// `[stage.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Source globs, relative to `source_dir`.
    pub src: Vec<String>,

    /// Globs removed from the `src` match set (e.g. `_*.html` partials).
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Globs that re-trigger this stage in `watch`. Empty means unwatched.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Output directory relative to the target root.
    #[serde(default)]
    pub out: PathBuf,

    /// Transforms applied to every source file, in order.
    #[serde(default)]
    pub chain: Vec<String>,

    /// Output variants written for every source file, in order.
    #[serde(default = "default_artifacts", rename = "artifact")]
    pub artifacts: Vec<ArtifactConfig>,

    #[serde(default)]
    pub target: StageTarget,

    /// Whether `build` (and therefore `watch`) runs this stage.
    #[serde(default = "default_in_build")]
    pub in_build: bool,

    /// Only re-run on a watch event when the watched content actually changed.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_artifacts() -> Vec<ArtifactConfig> {
    vec![ArtifactConfig::default()]
}

fn default_in_build() -> bool {
    true
}

impl StageConfig {
    /// Every transform name this stage references, stage chain first.
    pub fn referenced_transforms(&self) -> impl Iterator<Item = &str> {
        self.chain
            .iter()
            .chain(self.artifacts.iter().flat_map(|a| a.chain.iter()))
            .map(|s| s.as_str())
    }

    /// Root that `out` is resolved against for this stage's target.
    pub fn target_root<'a>(&self, section: &'a ConfigSection) -> &'a Path {
        match self.target {
            StageTarget::Output => &section.output_dir,
            StageTarget::Source => &section.source_dir,
        }
    }
}

/// `[[stage.<name>.artifact]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactConfig {
    /// Replacement extension (e.g. `"min.css"`); `None` keeps the source's.
    #[serde(default)]
    pub extension: Option<String>,

    /// Transforms applied on top of the stage chain's result.
    #[serde(default)]
    pub chain: Vec<String>,
}
