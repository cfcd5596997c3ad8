//! Bounded LRU store of per-shard results

use std::num::NonZeroUsize;
use std::sync::Arc;
use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::model::{Aggregates, Analytics, Intervals};

/// A cached shard result, tagged with the operation that produced it
#[derive(Debug, Clone)]
pub enum CachedResult {
    Analytics(Arc<Analytics>),
    Aggregates(Arc<Aggregates>),
    Intervals(Arc<Intervals>),
}

impl CachedResult {
    /// Name of the result shape
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Analytics(_) => "analytics",
            Self::Aggregates(_) => "aggregates",
            Self::Intervals(_) => "intervals",
        }
    }
}

/// Shard result types that can live in the cache
pub trait CacheShape: Sized + Send + Sync {
    /// Name of the shape, matching [`CachedResult::kind`]
    const KIND: &'static str;

    /// Wrap a shard result for storage
    fn into_cached(result: Arc<Self>) -> CachedResult;

    /// Unwrap a cached value, failing if it holds another shape
    fn from_cached(cached: CachedResult) -> Result<Arc<Self>>;
}

fn shape_mismatch(expected: &str, cached: &CachedResult) -> Error {
    Error::internal(format!(
        "cached value has shape {}, expected {}",
        cached.kind(),
        expected
    ))
}

impl CacheShape for Analytics {
    const KIND: &'static str = "analytics";

    fn into_cached(result: Arc<Self>) -> CachedResult {
        CachedResult::Analytics(result)
    }

    fn from_cached(cached: CachedResult) -> Result<Arc<Self>> {
        match cached {
            CachedResult::Analytics(result) => Ok(result),
            other => Err(shape_mismatch(Self::KIND, &other)),
        }
    }
}

impl CacheShape for Aggregates {
    const KIND: &'static str = "aggregates";

    fn into_cached(result: Arc<Self>) -> CachedResult {
        CachedResult::Aggregates(result)
    }

    fn from_cached(cached: CachedResult) -> Result<Arc<Self>> {
        match cached {
            CachedResult::Aggregates(result) => Ok(result),
            other => Err(shape_mismatch(Self::KIND, &other)),
        }
    }
}

impl CacheShape for Intervals {
    const KIND: &'static str = "intervals";

    fn into_cached(result: Arc<Self>) -> CachedResult {
        CachedResult::Intervals(result)
    }

    fn from_cached(cached: CachedResult) -> Result<Arc<Self>> {
        match cached {
            CachedResult::Intervals(result) => Ok(result),
            other => Err(shape_mismatch(Self::KIND, &other)),
        }
    }
}

/// Fixed-capacity result cache with least-recently-used eviction.
///
/// Safe to share between threads; every access takes the internal lock for
/// the duration of a single `get` or `put`.
pub struct ResultCache {
    entries: Mutex<LruCache<String, CachedResult>>,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a key, marking it most recently used
    pub fn get(&self, key: &str) -> Option<CachedResult> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert a value, evicting the least recently used entry when full
    pub fn put(&self, key: String, value: CachedResult) {
        self.entries.lock().put(key, value);
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("ResultCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
