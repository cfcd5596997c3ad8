//! Configuration for the sharded driver
//!
//! This module provides configuration options for the analytics driver.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration options for a sharded driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DriverConfig {
    // Storage configuration
    /// Root directory holding one sub-directory per dataset
    pub directory: Option<PathBuf>,
    /// Milliseconds SQLite waits on a busy shard file before failing
    pub sqlite_busy_timeout_ms: u64,

    // Query settings
    /// Maximum number of shard results kept in the result cache
    pub cache_size: usize,
    /// Whether shards of one request are executed in parallel
    pub parallel_shard_queries: bool,

    // Additional settings
    /// Enable metrics collection
    pub collect_metrics: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            directory: None,
            sqlite_busy_timeout_ms: 5_000,

            cache_size: 1_000,
            parallel_shard_queries: false,

            collect_metrics: true,
        }
    }
}

impl DriverConfig {
    /// Create a new driver configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root data directory
    pub fn with_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the SQLite busy timeout in milliseconds
    pub fn with_sqlite_busy_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.sqlite_busy_timeout_ms = timeout_ms;
        self
    }

    /// Set the number of cached shard results
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set whether shards are queried in parallel
    pub fn with_parallel_shard_queries(mut self, parallel: bool) -> Self {
        self.parallel_shard_queries = parallel;
        self
    }

    /// Set whether to collect metrics
    pub fn with_collect_metrics(mut self, collect: bool) -> Self {
        self.collect_metrics = collect;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.directory {
            None => return Err(Error::config("A data directory is required")),
            Some(ref dir) if dir.as_os_str().is_empty() => {
                return Err(Error::config("Data directory must not be empty"));
            }
            Some(_) => {}
        }

        if self.cache_size < 1 {
            return Err(Error::config("Cache size must be at least 1 entry"));
        }

        Ok(())
    }

    /// Get the SQLite busy timeout as a Duration
    pub fn sqlite_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.sqlite_busy_timeout_ms)
    }

    /// Create a human-readable string representation of the configuration
    pub fn to_string_pretty(&self) -> String {
        let mut result = String::new();

        result.push_str("=== Analytics Driver Configuration ===\n\n");

        result.push_str("Storage Configuration:\n");
        if let Some(ref dir) = self.directory {
            result.push_str(&format!("  Directory: {:?}\n", dir));
        }
        result.push_str(&format!("  SQLite Busy Timeout: {} ms\n", self.sqlite_busy_timeout_ms));

        result.push_str("\nQuery Settings:\n");
        result.push_str(&format!("  Cache Size: {} entries\n", self.cache_size));
        result.push_str(&format!("  Parallel Shard Queries: {}\n", self.parallel_shard_queries));

        result.push_str("\nAdditional Settings:\n");
        result.push_str(&format!("  Collect Metrics: {}\n", self.collect_metrics));

        result
    }

    /// Load configuration from a TOML file
    #[cfg(feature = "toml")]
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        use std::fs::read_to_string;
        use toml::from_str;

        let content = read_to_string(path)?;
        let config = from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse TOML: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    #[cfg(feature = "toml")]
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::fs::write;
        use toml::to_string_pretty;

        let content = to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize to TOML: {}", e)))?;

        write(path, content)?;

        Ok(())
    }
}
