//! Shard result caching
//!
//! Results are cached per shard under a key derived from the request URL.
//! The key drops every parameter that cannot change the shard's result, and
//! the still-open current month is never cached.

pub mod key;
mod result;

pub use key::{build_key, is_cache_requested, KeyInputs};
pub use result::{CacheShape, CachedResult, ResultCache};
