// src/transform/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use super::{CommandTransform, IncludeTransform, Transform};
use crate::config::ConfigFile;
use crate::errors::AssetdagError;

/// Name -> transform lookup used when stages are compiled.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Registry holding only the built-in transforms.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::default();
        registry.register(Arc::new(IncludeTransform::new()?));
        Ok(registry)
    }

    /// Built-ins plus one [`CommandTransform`] per `[transform.<name>]`.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::builtin()?;
        for (name, t) in cfg.transforms().iter() {
            registry.register(Arc::new(CommandTransform::new(
                name.clone(),
                t.cmd.clone(),
                t.output_extension.clone(),
            )));
        }
        Ok(registry)
    }

    /// Add or replace a transform under its own name.
    pub fn register(&mut self, transform: Arc<dyn Transform>) {
        self.transforms.insert(transform.name().to_string(), transform);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.transforms.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Resolve a list of names into a chain, preserving order.
    pub fn resolve_chain(&self, names: &[String]) -> crate::errors::Result<Vec<Arc<dyn Transform>>> {
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    AssetdagError::ConfigError(format!("unknown transform '{name}'"))
                })
            })
            .collect()
    }
}
