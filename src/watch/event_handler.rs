// src/watch/event_handler.rs

//! Turns a single changed path into stage triggers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::types::StageName;
use crate::watch::cache::FileCache;
use crate::watch::hash::{compute_aggregate_hash, HashStore, MemoryHashStore};
use crate::watch::path_utils::{relative_str, slash_str};
use crate::watch::patterns::{collect_matching_files, StageWatchProfile};

/// Everything the watch loop needs to evaluate an event.
#[derive(Clone)]
pub struct WatchState {
    pub fs: Arc<dyn FileSystem>,
    /// Source root all watch globs are relative to.
    pub root: PathBuf,
    pub profiles: Arc<Vec<StageWatchProfile>>,
    pub hash_store: Arc<Mutex<Box<dyn HashStore>>>,
    pub file_cache: Arc<Mutex<FileCache>>,
    /// Directories under `root` (relative, `/`-separated) whose events are
    /// dropped: the output tree when it lives inside the source root.
    pub ignored_dirs: Vec<String>,
}

impl WatchState {
    pub fn new(fs: Arc<dyn FileSystem>, root: PathBuf, profiles: Vec<StageWatchProfile>) -> Self {
        Self {
            fs,
            root,
            profiles: Arc::new(profiles),
            hash_store: Arc::new(Mutex::new(Box::new(MemoryHashStore::new()))),
            file_cache: Arc::new(Mutex::new(FileCache::new())),
            ignored_dirs: Vec::new(),
        }
    }

    /// Drop events for `dir` and everything beneath it, if `dir` sits
    /// inside the watched root. Stages write there, so without this a
    /// stage's own output would re-trigger it.
    pub fn ignoring(mut self, dir: &Path) -> Self {
        if let Ok(rel) = dir.strip_prefix(&self.root) {
            let rel = slash_str(rel);
            if !rel.is_empty() {
                self.ignored_dirs.push(rel);
            }
        }
        self
    }

    fn is_ignored(&self, rel_path: &str) -> bool {
        self.ignored_dirs.iter().any(|dir| {
            rel_path
                .strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// Process a single file change event and trigger the matching stages.
///
/// 1. Relativize the path against the source root; drop it if it falls in
///    an ignored directory.
/// 2. Find every watch binding whose globs match it; each binding names
///    exactly one stage, and no other stage is touched.
/// 3. For `use_hash` stages, skip the trigger when the watched content is
///    unchanged.
/// 4. Send `StageTriggered` to the runtime.
///
/// Returns the stages that were triggered.
pub async fn process_file_change(
    state: &WatchState,
    path: &Path,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Vec<StageName> {
    let mut triggered = Vec::new();

    let rel_str = match relative_str(&state.root, path) {
        Some(s) => s,
        None => {
            warn!(
                "could not relativize path {:?} against root {:?}",
                path, state.root
            );
            return triggered;
        }
    };

    debug!(?path, rel = %rel_str, "normalized event path");

    if state.is_ignored(&rel_str) {
        debug!(rel = %rel_str, "event inside an ignored directory; skipping");
        return triggered;
    }

    let matching: Vec<&StageWatchProfile> = state
        .profiles
        .iter()
        .filter(|p| p.matches(&rel_str))
        .collect();

    for profile in matching {
        if !should_trigger_stage(state, path, &rel_str, profile).await {
            continue;
        }

        let stage = profile.name().to_string();
        debug!(stage = %stage, path = %rel_str, "watch match -> triggering stage");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::StageTriggered {
                stage: stage.clone(),
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::StageTriggered: {err}");
            return triggered;
        }
        triggered.push(stage);
    }

    triggered
}

/// Check if a stage should be triggered based on hash comparison.
///
/// Returns true if the stage should be triggered, false if it should be
/// skipped. Any failure along the way errs on the side of triggering.
async fn should_trigger_stage(
    state: &WatchState,
    abs_path: &Path,
    rel_path: &str,
    profile: &StageWatchProfile,
) -> bool {
    if !profile.use_hash() {
        return true;
    }

    let state = state.clone();
    let abs_path = abs_path.to_path_buf();
    let profile = profile.clone();
    let rel_path = rel_path.to_string();

    tokio::task::spawn_blocking(move || {
        let stage = profile.name().to_string();
        let fs = state.fs.as_ref();

        let files = match collect_matching_files(fs, &state.root, &profile) {
            Ok(f) => f,
            Err(err) => {
                warn!(stage = %stage, error = %err, "failed to collect watched files; triggering anyway");
                return true;
            }
        };

        let mut file_hashes = Vec::with_capacity(files.len());
        {
            let mut cache = match state.file_cache.lock() {
                Ok(g) => g,
                Err(_) => {
                    warn!("file cache mutex poisoned; triggering anyway");
                    return true;
                }
            };
            cache.invalidate(&abs_path);

            for file_path in files {
                match cache.get_or_compute(fs, &file_path) {
                    Ok(h) => file_hashes.push(h),
                    Err(err) => {
                        warn!(
                            stage = %stage,
                            file = ?file_path,
                            error = %err,
                            "failed to compute file hash; triggering anyway"
                        );
                        return true;
                    }
                }
            }
        }

        let new_hash = compute_aggregate_hash(&file_hashes);

        let mut store = match state.hash_store.lock() {
            Ok(guard) => guard,
            Err(_poisoned) => {
                warn!(stage = %stage, "hash store mutex poisoned; triggering anyway");
                return true;
            }
        };

        match store.load(&stage) {
            Ok(Some(old_hash)) if old_hash == new_hash => {
                info!(
                    stage = %stage,
                    path = %rel_path,
                    "watched content unchanged; skipping trigger"
                );
                return false;
            }
            Ok(_) => {
                if let Err(err) = store.save(&stage, &new_hash) {
                    warn!(stage = %stage, error = %err, "failed to save stage hash");
                }
            }
            Err(err) => {
                warn!(stage = %stage, error = %err, "failed to load stage hash; triggering anyway");
            }
        }

        true
    })
    .await
    .unwrap_or(true)
}
