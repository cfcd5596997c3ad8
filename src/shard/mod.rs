//! Month-based shard management for analytics datasets
//!
//! A dataset is a directory holding one sub-directory per calendar month.
//! Each shard is identified by a "YYYY-MM" label that maps onto a sortable
//! YYYYMM integer, which is what range pruning and cache keys work with.

mod error;
mod label;
pub mod range;
mod resolver;

pub use error::{ShardError, ShardResult};
pub use label::{label_for, label_to_int, ShardLabel};
pub use resolver::{shard_path, DirectoryResolver, ShardResolver};

/// File name of the embedded database inside each shard directory
pub const SHARD_DB_FILE: &str = "analytics.db";
