//! Shard discovery for a dataset directory
//!
//! Only directories whose name is a well-formed "YYYY-MM" label count as
//! shards. Anything else in the dataset directory is skipped.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::shard::{ShardError, ShardLabel, ShardResult};

/// Enumerates the shards of a dataset
pub trait ShardResolver: Send + Sync {
    /// List the shard labels under `dataset_path` in ascending order
    fn list_shards(&self, dataset_path: &Path) -> ShardResult<Vec<ShardLabel>>;
}

/// Resolver reading shard directories straight from disk on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryResolver;

impl ShardResolver for DirectoryResolver {
    fn list_shards(&self, dataset_path: &Path) -> ShardResult<Vec<ShardLabel>> {
        let entries = fs::read_dir(dataset_path).map_err(|e| {
            ShardError::file_error(dataset_path, format!("Failed to list shards: {}", e))
        })?;

        let mut shards = Vec::new();

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();

            if !entry.file_type()?.is_dir() {
                debug!(dataset = %dataset_path.display(), entry = ?name, "ignoring non-directory entry");
                continue;
            }

            match name.to_str().map(str::parse::<ShardLabel>) {
                Some(Ok(label)) => shards.push(label),
                _ => {
                    warn!(dataset = %dataset_path.display(), entry = ?name, "skipping malformed shard directory");
                }
            }
        }

        shards.sort();

        Ok(shards)
    }
}

/// Get the directory of a shard inside a dataset
pub fn shard_path(dataset_path: &Path, label: &ShardLabel) -> PathBuf {
    dataset_path.join(label.to_string())
}
