// src/lib.rs

pub mod clean;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod plan;
pub mod server;
pub mod stage;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate, load_or_default};
use crate::config::ConfigFile;
use crate::fs::{FileSystem, RealFileSystem};
use crate::plan::{build_plan, ExecutablePlan, Pipeline};
use crate::server::{BroadcastReloader, DevServer, NoopReloader, ReloadSink};
use crate::transform::TransformRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (or the built-in pipeline)
/// - the selected plan
/// - the dev server (watch plan only)
/// - the pipeline executor
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, cfg) = match args.config {
        Some(ref path) => {
            let path = PathBuf::from(path);
            let cfg = load_and_validate(&path)?;
            (path, cfg)
        }
        None => {
            let path = default_config_path();
            let cfg = load_or_default(&path)?;
            (path, cfg)
        }
    };

    let plan = build_plan(&cfg, args.plan.clone())?;

    if args.dry_run {
        print_dry_run(&cfg, &plan);
        return Ok(());
    }

    let project_root = config_root_dir(&config_path);
    let registry = TransformRegistry::from_config(&cfg)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let pipeline = Pipeline::from_config(cfg, &project_root, &registry, fs)?;

    let reloader: Arc<dyn ReloadSink> = if plan.serves() {
        let broadcast = BroadcastReloader::default();
        let section = &pipeline.config().config;
        let server = DevServer::bind(
            &section.host,
            section.port,
            pipeline.paths().output_root(),
            broadcast.clone(),
        )
        .await?;
        tokio::spawn(async move {
            if let Err(err) = server.serve().await {
                error!("dev server error: {err:#}");
            }
        });
        Arc::new(broadcast)
    } else {
        Arc::new(NoopReloader)
    };

    pipeline.execute(&plan, reloader).await?;
    Ok(())
}

/// Figure out the project root that `source_dir` / `output_dir` are
/// relative to.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetdag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetdag.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print stages, transforms and the plan layers.
fn print_dry_run(cfg: &ConfigFile, plan: &ExecutablePlan) {
    println!("assetdag dry-run");
    println!("  config.source_dir = {:?}", cfg.config.source_dir);
    println!("  config.output_dir = {:?}", cfg.config.output_dir);
    println!("  config.port = {}", cfg.config.port);
    println!();

    println!("transforms ({}):", cfg.transforms().len());
    for (name, t) in cfg.transforms() {
        println!("  - {name}: {}", t.cmd);
    }
    println!();

    println!("stages ({}):", cfg.stages().len());
    for (name, stage) in cfg.stages() {
        println!("  - {name}");
        println!("      src: {:?}", stage.src);
        if !stage.exclude.is_empty() {
            println!("      exclude: {:?}", stage.exclude);
        }
        if !stage.watch.is_empty() {
            println!("      watch: {:?}", stage.watch);
        }
        println!("      out: {:?} ({:?})", stage.out, stage.target);
        if !stage.chain.is_empty() {
            println!("      chain: {:?}", stage.chain);
        }
        for artifact in &stage.artifacts {
            println!(
                "      artifact: .{} {:?}",
                artifact.extension.as_deref().unwrap_or("*"),
                artifact.chain
            );
        }
        if !stage.in_build {
            println!("      in_build: false");
        }
        if stage.use_hash {
            println!("      use_hash: true");
        }
    }
    println!();

    let graph = plan.graph();
    println!("plan {:?}:", plan.kind());
    for (i, layer) in graph.execution_layers().iter().enumerate() {
        let labels: Vec<String> = layer.iter().map(|n| graph.label(*n)).collect();
        println!("  {i}: {}", labels.join(" | "));
    }

    debug!("dry-run complete (no execution)");
}
