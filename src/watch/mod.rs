// src/watch/mod.rs

//! File watching: map changed source paths to the stage they belong to.
//!
//! Each watched stage owns one binding (a set of globs relative to the
//! source root). A change re-runs only the stage(s) whose binding matches.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{process_file_change, WatchState};
pub use hash::{compute_aggregate_hash, compute_file_hash, HashStore, MemoryHashStore};
pub use patterns::{build_globset, build_profiles, StageWatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
