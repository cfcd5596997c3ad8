//! # cocoon_analytics
//!
//! A month-sharded analytics store. Each dataset is a directory with one
//! SQLite shard per calendar month (`<root>/<dataset>/<YYYY-MM>/`). Reads
//! are federated over the shards of the requested range and merged; shard
//! results of finished months are kept in a bounded LRU cache.
//!
//! ```no_run
//! use cocoon_analytics::{Analytic, Driver, DriverConfig, Params, SqliteDriver};
//! use chrono::Utc;
//! use url::Url;
//!
//! # fn main() -> cocoon_analytics::Result<()> {
//! let driver = SqliteDriver::open(DriverConfig::new().with_directory("/var/lib/analytics"))?;
//!
//! let url = Url::parse("http://localhost/website/query?cache=1").unwrap();
//! let params = Params::new("website", url);
//!
//! driver.insert(&params, &Analytic::new(Utc::now()).with_path("/"))?;
//! let visits = driver.query(&params)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod manager;
pub mod metrics;
pub mod model;
pub mod shard;

pub use cache::{CachedResult, ResultCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DriverConfig;
pub use driver::{Driver, ShardedDriver};
pub use error::{Error, Result};
pub use executor::{QueryExecutor, SqliteExecutor};
pub use manager::{ConnectionManager, ShardHandle, SqliteManager};
pub use metrics::MetricsCollector;
pub use model::{
    Aggregate, Aggregates, Analytic, Analytics, Interval, Intervals, Params, Property, TimeRange,
};
pub use shard::{ShardLabel, ShardResolver};

/// Driver storing every shard in its own SQLite file
pub type SqliteDriver = ShardedDriver<SqliteManager, SqliteExecutor>;
