// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::event_handler::{process_file_change, WatchState};
use crate::watch::patterns::StageWatchProfile;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes the source `root` recursively
/// and sends `RuntimeEvent::StageTriggered` for stages whose watch bindings
/// match a changed path.
///
/// - `root` is the source root against which all watch globs are evaluated.
/// - `profiles` holds one compiled binding per watched stage.
/// - `runtime_tx` is the channel into the main runtime.
/// - `output_root`, when it lies inside `root`, is not watched: writes there
///   come from the stages themselves.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<StageWatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    fs: Arc<dyn FileSystem>,
    output_root: &Path,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Relative before canonicalizing: the output root may not exist yet.
    let ignored = output_root.strip_prefix(&root).ok().map(Path::to_path_buf);
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        {
            let event_tx = event_tx.clone();
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        eprintln!("assetdag: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("assetdag: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    let mut state = WatchState::new(fs, root.clone(), profiles);
    if let Some(rel) = ignored {
        state = state.ignoring(&root.join(rel));
    }

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            // Reads of our own sources would otherwise retrigger stages.
            if event.kind.is_access() {
                continue;
            }
            debug!(?event, "received notify event");

            for path in event.paths {
                process_file_change(&state, &path, &runtime_tx).await;
            }
        }
        debug!("watch event stream ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}
