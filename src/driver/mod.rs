//! Month-sharded driver
//!
//! Every dataset is a directory holding one shard per calendar month. Read
//! operations fan out over the shards inside the requested range, reuse
//! cached shard results where possible and merge what they get back.

mod merge;

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cache::{build_key, is_cache_requested, CacheShape, KeyInputs, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::executor::{QueryExecutor, SqliteExecutor};
use crate::manager::{ConnectionManager, SqliteManager};
use crate::metrics::MetricsCollector;
use crate::model::{Aggregates, Analytic, Analytics, Intervals, Params};
use crate::shard::range::{in_range, resolve_bounds};
use crate::shard::{shard_path, DirectoryResolver, ShardLabel, ShardResolver};

pub use merge::{concat_analytics, concat_intervals, merge_aggregates};

/// Operations offered to request handlers
pub trait Driver: Send + Sync {
    /// Raw records of the requested range
    fn query(&self, params: &Params) -> Result<Analytics>;

    /// Record counts grouped by `params.property`
    fn group_by(&self, params: &Params) -> Result<Aggregates>;

    /// Record counts bucketed every `params.interval` seconds
    fn series(&self, params: &Params) -> Result<Intervals>;

    /// Write one record into the shard of its month
    fn insert(&self, params: &Params, analytic: &Analytic) -> Result<()>;

    /// Remove a dataset with all of its shards
    fn delete(&self, params: &Params) -> Result<()>;
}

/// Values shared by every shard of one read request
struct ShardRequest<'a> {
    dataset_path: &'a Path,
    params: &'a Params,
    start: u32,
    end: u32,
    now: u32,
    cache_requested: bool,
    inputs: KeyInputs,
}

/// Driver fanning requests out over month shards
pub struct ShardedDriver<M, E> {
    /// Root directory holding one directory per dataset
    directory: PathBuf,
    /// Driver configuration
    config: DriverConfig,
    /// Shard storage
    manager: Arc<M>,
    /// Per-shard operations
    executor: Arc<E>,
    /// Shard discovery
    resolver: Arc<dyn ShardResolver>,
    /// Cached results of past months
    cache: Arc<ResultCache>,
    /// Source of the current month
    clock: Arc<dyn Clock>,
    /// Metrics collector
    metrics: Arc<MetricsCollector>,
}

impl ShardedDriver<SqliteManager, SqliteExecutor> {
    /// Open a driver storing shards as SQLite files under the configured directory
    pub fn open(config: DriverConfig) -> Result<Self> {
        let manager = SqliteManager::new(config.sqlite_busy_timeout());
        Self::with_parts(config, manager, SqliteExecutor)
    }
}

impl<M, E> ShardedDriver<M, E>
where
    M: ConnectionManager,
    E: QueryExecutor<M::Conn>,
{
    /// Create a driver from its storage and execution parts
    pub fn with_parts(config: DriverConfig, manager: M, executor: E) -> Result<Self> {
        config.validate()?;

        let directory = config
            .directory
            .clone()
            .ok_or_else(|| Error::config("A data directory is required"))?;

        fs::create_dir_all(&directory).map_err(|e| {
            Error::config(format!(
                "Failed to create directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        let cache = Arc::new(ResultCache::new(config.cache_size));

        Ok(Self {
            directory,
            config,
            manager: Arc::new(manager),
            executor: Arc::new(executor),
            resolver: Arc::new(DirectoryResolver),
            cache,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    /// Use another source of the current time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use another shard discovery strategy
    pub fn with_resolver(mut self, resolver: Arc<dyn ShardResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Share a result cache with other drivers
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Root data directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Driver configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Shard storage
    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Result cache
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Collected metrics
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    fn record(&self, f: impl FnOnce(&MetricsCollector)) {
        if self.config.collect_metrics {
            f(&self.metrics);
        }
    }

    /// Path of a dataset, rejecting names that would leave the data directory
    fn dataset_path(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => Ok(self.directory.join(name)),
            _ => Err(Error::invalid_database_name(name)),
        }
    }

    /// Path of an existing dataset
    fn existing_dataset(&self, name: &str) -> Result<PathBuf> {
        let path = self.dataset_path(name)?;

        if !self.manager.exists(&path).map_err(Error::into_internal)? {
            return Err(Error::invalid_database_name(name));
        }

        Ok(path)
    }

    /// Run `execute` on every shard of the requested range, in shard order
    fn fetch_shards<T, F>(&self, params: &Params, inputs: KeyInputs, execute: F) -> Result<Vec<Arc<T>>>
    where
        T: CacheShape,
        F: Fn(&M::Conn) -> Result<T> + Sync,
    {
        let dataset_path = self.existing_dataset(&params.dataset)?;

        let labels = self.resolver.list_shards(&dataset_path)?;
        let (start, end) = resolve_bounds(params.time_range.as_ref());
        let now = ShardLabel::from_timestamp(&self.clock.now())?.to_int();

        let total = labels.len();
        let shards: Vec<u32> = labels
            .iter()
            .map(ShardLabel::to_int)
            .filter(|&shard| {
                let keep = in_range(shard, start, end);
                if !keep {
                    debug!(dataset = %params.dataset, shard, start, end, "shard outside range");
                }
                keep
            })
            .collect();

        self.record(|m| {
            m.add_shards_scanned(shards.len());
            m.add_shards_skipped(total - shards.len());
        });

        let request = ShardRequest {
            dataset_path: &dataset_path,
            params,
            start,
            end,
            now,
            cache_requested: is_cache_requested(&params.url),
            inputs,
        };

        if self.config.parallel_shard_queries && shards.len() > 1 {
            shards
                .par_iter()
                .map(|&shard| self.fetch_shard(&request, shard, &execute))
                .collect()
        } else {
            shards
                .iter()
                .map(|&shard| self.fetch_shard(&request, shard, &execute))
                .collect()
        }
    }

    fn fetch_shard<T, F>(&self, request: &ShardRequest<'_>, shard: u32, execute: &F) -> Result<Arc<T>>
    where
        T: CacheShape,
        F: Fn(&M::Conn) -> Result<T> + Sync,
    {
        let key = build_key(
            &request.params.url,
            &request.inputs,
            shard,
            request.start,
            request.end,
            request.now,
        );

        if let Some(cached) = self.cache.get(&key) {
            self.record(|m| m.increment_cache_hits());
            debug!(dataset = %request.params.dataset, shard, "shard result from cache");
            return T::from_cached(cached);
        }
        self.record(|m| m.increment_cache_misses());

        let label = ShardLabel::from_int(shard)?;
        let handle = self
            .manager
            .get_connection(&shard_path(request.dataset_path, &label))
            .map_err(Error::into_internal)?;

        let started = Instant::now();
        let result = {
            let conn = handle.lock();
            execute(&*conn)
        };
        self.record(|m| m.record_shard_execution(started.elapsed()));

        let result = Arc::new(result.map_err(Error::into_internal)?);
        debug!(dataset = %request.params.dataset, shard = %label, "executed shard");

        if request.cache_requested && shard < request.now {
            self.cache.put(key, T::into_cached(Arc::clone(&result)));
            self.record(|m| m.increment_cache_stores());
            debug!(dataset = %request.params.dataset, shard = %label, "stored shard result");
        }

        Ok(result)
    }

    /// Key inputs every read shares: result shape and executed range
    fn key_inputs<T: CacheShape>(params: &Params) -> KeyInputs {
        let range = params.time_range.as_ref();
        KeyInputs::new(T::KIND)
            .with("start", range.and_then(|r| r.start).map(key_time))
            .with("end", range.and_then(|r| r.end).map(key_time))
    }

    fn timed<T>(&self, operation: impl FnOnce() -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let result = operation();
        self.record(|m| {
            m.increment_queries();
            m.record_query_duration(started.elapsed());
        });
        result
    }
}

impl<M, E> Driver for ShardedDriver<M, E>
where
    M: ConnectionManager,
    E: QueryExecutor<M::Conn>,
{
    fn query(&self, params: &Params) -> Result<Analytics> {
        self.timed(|| {
            let range = params.time_range.as_ref();
            let inputs = Self::key_inputs::<Analytics>(params);
            let parts = self.fetch_shards(params, inputs, |conn| self.executor.query(conn, range))?;
            Ok(concat_analytics(&parts))
        })
    }

    fn group_by(&self, params: &Params) -> Result<Aggregates> {
        self.timed(|| {
            let property = params.property.ok_or(Error::MissingProperty)?;
            let range = params.time_range.as_ref();
            let inputs = Self::key_inputs::<Aggregates>(params)
                .with("property", Some(property.column()))
                .with("unique", Some(params.unique));

            let parts = self.fetch_shards(params, inputs, |conn| {
                if params.unique {
                    self.executor.group_by_unique(conn, property, range)
                } else {
                    self.executor.group_by(conn, property, range)
                }
            })?;

            Ok(merge_aggregates(&parts))
        })
    }

    fn series(&self, params: &Params) -> Result<Intervals> {
        self.timed(|| {
            let interval = match params.interval {
                Some(seconds) if seconds > 0 => seconds,
                Some(seconds) => return Err(Error::InvalidInterval(seconds)),
                None => return Err(Error::InvalidInterval(0)),
            };
            let range = params.time_range.as_ref();
            let inputs = Self::key_inputs::<Intervals>(params)
                .with("interval", Some(interval))
                .with("unique", Some(params.unique));

            let parts = self.fetch_shards(params, inputs, |conn| {
                if params.unique {
                    self.executor.series_unique(conn, interval, range)
                } else {
                    self.executor.series(conn, interval, range)
                }
            })?;

            Ok(concat_intervals(&parts))
        })
    }

    fn insert(&self, params: &Params, analytic: &Analytic) -> Result<()> {
        let started = Instant::now();

        let dataset_path = self.dataset_path(&params.dataset)?;
        let label = ShardLabel::from_timestamp(&analytic.time)?;
        let path = shard_path(&dataset_path, &label);

        let created = !self.manager.exists(&path).map_err(Error::into_internal)?;
        let handle = self
            .manager
            .get_connection(&path)
            .map_err(Error::into_internal)?;

        if created {
            info!(dataset = %params.dataset, shard = %label, "created shard");
        }

        let result = {
            let conn = handle.lock();
            self.executor.insert(&*conn, analytic)
        };

        if let Err(e) = result {
            self.record(|m| m.increment_failed_inserts());
            return Err(Error::insert_failed(e.to_string()));
        }

        self.record(|m| {
            m.increment_inserts();
            m.record_insert_duration(started.elapsed());
        });

        Ok(())
    }

    fn delete(&self, params: &Params) -> Result<()> {
        let dataset_path = self.existing_dataset(&params.dataset)?;

        self.manager.delete(&dataset_path)?;
        self.record(|m| m.increment_deletes());

        info!(dataset = %params.dataset, "deleted dataset");

        Ok(())
    }
}

fn key_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
