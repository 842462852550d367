use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute aggregate hash from a list of file hashes.
///
/// `hashes` must be sorted by the corresponding file path to ensure stability.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = hashes.len(), "computed aggregate hash");
    hash
}

/// Abstract storage for per-stage content hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, stage: &str) -> Result<Option<String>>;
    fn save(&mut self, stage: &str, hash: &str) -> Result<()>;
}

/// Stores hashes in memory only (lost on restart).
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, stage: &str) -> Result<Option<String>> {
        Ok(self.map.get(stage).cloned())
    }

    fn save(&mut self, stage: &str, hash: &str) -> Result<()> {
        self.map.insert(stage.to_string(), hash.to_string());
        info!(stage = %stage, hash = %hash, "stored stage hash (memory)");
        Ok(())
    }
}
