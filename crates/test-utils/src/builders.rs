#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use assetdag::config::{
    ArtifactConfig, ConfigFile, ConfigSection, RawConfigFile, StageConfig, TransformConfig,
};
use assetdag::errors::Result;
use assetdag::types::StageTarget;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                transform: BTreeMap::new(),
                stage: BTreeMap::new(),
            },
        }
    }

    pub fn with_stage(mut self, name: &str, stage: StageConfig) -> Self {
        self.config.stage.insert(name.to_string(), stage);
        self
    }

    pub fn with_transform(mut self, name: &str, cmd: &str) -> Self {
        self.config.transform.insert(
            name.to_string(),
            TransformConfig {
                cmd: cmd.to_string(),
                output_extension: None,
            },
        );
        self
    }

    pub fn source_dir(mut self, dir: &str) -> Self {
        self.config.config.source_dir = PathBuf::from(dir);
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.config.config.output_dir = PathBuf::from(dir);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.config.port = port;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StageConfig`.
///
/// Without any `artifact(..)` call the stage gets the single default
/// artifact (same name, no extra chain).
pub struct StageConfigBuilder {
    stage: StageConfig,
    artifacts: Vec<ArtifactConfig>,
}

impl StageConfigBuilder {
    pub fn new(src: &str) -> Self {
        Self {
            stage: StageConfig {
                src: vec![src.to_string()],
                exclude: vec![],
                watch: vec![],
                out: PathBuf::new(),
                chain: vec![],
                artifacts: vec![ArtifactConfig::default()],
                target: StageTarget::Output,
                in_build: true,
                use_hash: false,
            },
            artifacts: vec![],
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.stage.src.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.stage.exclude.push(pattern.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.stage.watch.push(pattern.to_string());
        self
    }

    pub fn out(mut self, dir: &str) -> Self {
        self.stage.out = PathBuf::from(dir);
        self
    }

    pub fn chain(mut self, transform: &str) -> Self {
        self.stage.chain.push(transform.to_string());
        self
    }

    pub fn artifact(mut self, extension: Option<&str>, chain: &[&str]) -> Self {
        self.artifacts.push(ArtifactConfig {
            extension: extension.map(str::to_string),
            chain: chain.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn target(mut self, target: StageTarget) -> Self {
        self.stage.target = target;
        self
    }

    pub fn in_build(mut self, val: bool) -> Self {
        self.stage.in_build = val;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.stage.use_hash = val;
        self
    }

    pub fn build(mut self) -> StageConfig {
        if !self.artifacts.is_empty() {
            self.stage.artifacts = self.artifacts;
        }
        self.stage
    }
}
