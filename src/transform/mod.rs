// src/transform/mod.rs

//! Byte-to-byte transforms and the chains stages build from them.
//!
//! Every transform is a black box with one contract: take the current bytes
//! of a file, return new bytes or an error. Stages compose them into ordered
//! chains; the output of transform *k* is the input of transform *k+1*.
//!
//! - [`command`] runs an external tool (sass, terser, imagemin, ...).
//! - [`include`] resolves `@@include('...')` directives natively.
//! - [`registry`] maps the names used in config to transform instances.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::fs::FileSystem;

pub mod command;
pub mod include;
pub mod registry;

pub use command::CommandTransform;
pub use include::IncludeTransform;
pub use registry::TransformRegistry;

/// Names of the transforms that are always available without config.
pub const BUILTIN_TRANSFORMS: &[&str] = &[include::INCLUDE_TRANSFORM];

/// Boxed future returned by [`Transform::apply`].
pub type TransformFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// What a transform may know about the file it is processing.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    pub stage: &'a str,
    /// The original source file (not the intermediate bytes).
    pub source: &'a Path,
    pub fs: &'a dyn FileSystem,
}

impl fmt::Debug for TransformContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("stage", &self.stage)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// A single `bytes -> bytes` conversion.
pub trait Transform: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn apply<'a>(&'a self, ctx: TransformContext<'a>, input: Vec<u8>) -> TransformFuture<'a>;
}

/// Run `input` through `chain` strictly in order.
///
/// Each transform is awaited to completion before the next one starts. The
/// first failure stops the chain and is returned with the transform's name
/// attached.
pub async fn apply_chain(
    chain: &[Arc<dyn Transform>],
    ctx: TransformContext<'_>,
    input: Vec<u8>,
) -> Result<Vec<u8>> {
    let mut bytes = input;
    for transform in chain {
        bytes = transform
            .apply(ctx, bytes)
            .await
            .with_context(|| format!("transform '{}'", transform.name()))?;
    }
    Ok(bytes)
}
