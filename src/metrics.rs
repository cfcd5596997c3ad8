use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Performance metrics collector for the sharded driver
#[derive(Debug)]
pub struct MetricsCollector {
    // Operation counts
    /// Number of read operations (query, group-by, series)
    query_count: AtomicUsize,
    /// Number of insert operations
    insert_count: AtomicUsize,
    /// Number of failed inserts
    failed_insert_count: AtomicUsize,
    /// Number of dataset deletions
    delete_count: AtomicUsize,

    // Shard metrics
    /// Shards retained by range pruning
    shards_scanned: AtomicUsize,
    /// Shards skipped by range pruning
    shards_skipped: AtomicUsize,
    /// Executor calls made against shards
    shard_executions: AtomicUsize,

    // Timing metrics
    /// Total read operation duration in nanoseconds
    query_duration_ns: AtomicU64,
    /// Total insert duration in nanoseconds
    insert_duration_ns: AtomicU64,
    /// Total time spent inside locked executor calls in nanoseconds
    execution_duration_ns: AtomicU64,

    // Cache metrics
    /// Number of cache hits
    cache_hits: AtomicUsize,
    /// Number of cache misses
    cache_misses: AtomicUsize,
    /// Number of shard results stored in the cache
    cache_stores: AtomicUsize,

    // Internal state
    /// Start time of the metrics collector
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            query_count: AtomicUsize::new(0),
            insert_count: AtomicUsize::new(0),
            failed_insert_count: AtomicUsize::new(0),
            delete_count: AtomicUsize::new(0),

            shards_scanned: AtomicUsize::new(0),
            shards_skipped: AtomicUsize::new(0),
            shard_executions: AtomicUsize::new(0),

            query_duration_ns: AtomicU64::new(0),
            insert_duration_ns: AtomicU64::new(0),
            execution_duration_ns: AtomicU64::new(0),

            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            cache_stores: AtomicUsize::new(0),

            start_time: Instant::now(),
        }
    }

    // Operation count methods

    /// Increment read operation count
    pub fn increment_queries(&self) {
        self.query_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment insert count
    pub fn increment_inserts(&self) {
        self.insert_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment failed insert count
    pub fn increment_failed_inserts(&self) {
        self.failed_insert_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment dataset deletion count
    pub fn increment_deletes(&self) {
        self.delete_count.fetch_add(1, Ordering::Relaxed);
    }

    // Shard metrics methods

    /// Add shards retained by pruning
    pub fn add_shards_scanned(&self, count: usize) {
        self.shards_scanned.fetch_add(count, Ordering::Relaxed);
    }

    /// Add shards skipped by pruning
    pub fn add_shards_skipped(&self, count: usize) {
        self.shards_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one executor call and how long it held the shard lock
    pub fn record_shard_execution(&self, duration: Duration) {
        self.shard_executions.fetch_add(1, Ordering::Relaxed);
        self.execution_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    // Timing metrics methods

    /// Record a read operation duration
    pub fn record_query_duration(&self, duration: Duration) {
        self.query_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record an insert duration
    pub fn record_insert_duration(&self, duration: Duration) {
        self.insert_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    // Cache metrics methods

    /// Increment cache hits
    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment cache misses
    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment cache stores
    pub fn increment_cache_stores(&self) {
        self.cache_stores.fetch_add(1, Ordering::Relaxed);
    }

    // Getters

    /// Get number of read operations
    pub fn get_query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Get number of inserts
    pub fn get_insert_count(&self) -> usize {
        self.insert_count.load(Ordering::Relaxed)
    }

    /// Get number of failed inserts
    pub fn get_failed_insert_count(&self) -> usize {
        self.failed_insert_count.load(Ordering::Relaxed)
    }

    /// Get number of dataset deletions
    pub fn get_delete_count(&self) -> usize {
        self.delete_count.load(Ordering::Relaxed)
    }

    /// Get number of shards retained by pruning
    pub fn get_shards_scanned(&self) -> usize {
        self.shards_scanned.load(Ordering::Relaxed)
    }

    /// Get number of shards skipped by pruning
    pub fn get_shards_skipped(&self) -> usize {
        self.shards_skipped.load(Ordering::Relaxed)
    }

    /// Get number of executor calls
    pub fn get_shard_executions(&self) -> usize {
        self.shard_executions.load(Ordering::Relaxed)
    }

    /// Get total read operation duration
    pub fn get_query_duration(&self) -> Duration {
        Duration::from_nanos(self.query_duration_ns.load(Ordering::Relaxed))
    }

    /// Get total insert duration
    pub fn get_insert_duration(&self) -> Duration {
        Duration::from_nanos(self.insert_duration_ns.load(Ordering::Relaxed))
    }

    /// Get total time spent in executor calls
    pub fn get_execution_duration(&self) -> Duration {
        Duration::from_nanos(self.execution_duration_ns.load(Ordering::Relaxed))
    }

    /// Get number of cache hits
    pub fn get_cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Get number of cache misses
    pub fn get_cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Get number of cache stores
    pub fn get_cache_stores(&self) -> usize {
        self.cache_stores.load(Ordering::Relaxed)
    }

    /// Get cache hit rate (0.0 - 1.0)
    pub fn get_cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);

        if hits + misses == 0 {
            return 0.0;
        }

        hits as f64 / (hits + misses) as f64
    }

    /// Get uptime of the metrics collector
    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.query_count.store(0, Ordering::Relaxed);
        self.insert_count.store(0, Ordering::Relaxed);
        self.failed_insert_count.store(0, Ordering::Relaxed);
        self.delete_count.store(0, Ordering::Relaxed);

        self.shards_scanned.store(0, Ordering::Relaxed);
        self.shards_skipped.store(0, Ordering::Relaxed);
        self.shard_executions.store(0, Ordering::Relaxed);

        self.query_duration_ns.store(0, Ordering::Relaxed);
        self.insert_duration_ns.store(0, Ordering::Relaxed);
        self.execution_duration_ns.store(0, Ordering::Relaxed);

        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.cache_stores.store(0, Ordering::Relaxed);
    }

    /// Get a report of all metrics
    pub fn get_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Analytics Driver Metrics ===\n\n");

        report.push_str(&format!("Uptime: {:?}\n\n", self.get_uptime()));

        report.push_str("Operation Counts:\n");
        report.push_str(&format!("  Queries: {}\n", self.get_query_count()));
        report.push_str(&format!("  Inserts: {}\n", self.get_insert_count()));
        report.push_str(&format!("  Failed Inserts: {}\n", self.get_failed_insert_count()));
        report.push_str(&format!("  Deletes: {}\n\n", self.get_delete_count()));

        report.push_str("Shard Metrics:\n");
        report.push_str(&format!("  Shards Scanned: {}\n", self.get_shards_scanned()));
        report.push_str(&format!("  Shards Skipped: {}\n", self.get_shards_skipped()));
        report.push_str(&format!("  Shard Executions: {}\n\n", self.get_shard_executions()));

        report.push_str("Performance Metrics:\n");
        if self.get_query_count() > 0 {
            let avg_query = self.get_query_duration().as_micros() / self.get_query_count() as u128;
            report.push_str(&format!("  Avg. Query Time: {}µs\n", avg_query));
        }
        if self.get_insert_count() > 0 {
            let avg_insert = self.get_insert_duration().as_micros() / self.get_insert_count() as u128;
            report.push_str(&format!("  Avg. Insert Time: {}µs\n", avg_insert));
        }
        if self.get_shard_executions() > 0 {
            let avg_execution =
                self.get_execution_duration().as_micros() / self.get_shard_executions() as u128;
            report.push_str(&format!("  Avg. Shard Execution Time: {}µs\n", avg_execution));
        }

        report.push_str("\nCache Metrics:\n");
        report.push_str(&format!("  Hits: {}\n", self.get_cache_hits()));
        report.push_str(&format!("  Misses: {}\n", self.get_cache_misses()));
        report.push_str(&format!("  Stores: {}\n", self.get_cache_stores()));
        report.push_str(&format!("  Hit Rate: {:.2}%\n", self.get_cache_hit_rate() * 100.0));

        report
    }
}
