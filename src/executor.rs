//! Per-shard query execution
//!
//! An executor runs one operation against one shard connection. It knows
//! nothing about other shards, caching or locking; the driver holds the
//! shard lock around every call.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::model::{Aggregate, Aggregates, Analytic, Analytics, Interval, Intervals, Property, TimeRange};

/// Shape-specific operations against a single shard connection
pub trait QueryExecutor<C>: Send + Sync {
    /// Records inside the range, oldest first
    fn query(&self, conn: &C, range: Option<&TimeRange>) -> Result<Analytics>;

    /// Record counts grouped by `property`
    fn group_by(&self, conn: &C, property: Property, range: Option<&TimeRange>) -> Result<Aggregates>;

    /// Record and distinct-IP counts grouped by `property`
    fn group_by_unique(
        &self,
        conn: &C,
        property: Property,
        range: Option<&TimeRange>,
    ) -> Result<Aggregates>;

    /// Record counts bucketed every `interval` seconds
    fn series(&self, conn: &C, interval: i64, range: Option<&TimeRange>) -> Result<Intervals>;

    /// Record and distinct-IP counts bucketed every `interval` seconds
    fn series_unique(&self, conn: &C, interval: i64, range: Option<&TimeRange>) -> Result<Intervals>;

    /// Write one record
    fn insert(&self, conn: &C, analytic: &Analytic) -> Result<()>;
}

// `time` holds unix milliseconds
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS visits (
        time INTEGER NOT NULL,
        event TEXT NOT NULL DEFAULT '',
        path TEXT NOT NULL DEFAULT '',
        ip TEXT NOT NULL DEFAULT '',
        platform TEXT NOT NULL DEFAULT '',
        refererDomain TEXT NOT NULL DEFAULT '',
        countryCode TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS visits_time ON visits (time);
";

/// Create the shard table if it does not exist yet
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Executor issuing SQL against SQLite shard files
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteExecutor;

impl SqliteExecutor {
    fn grouped(
        &self,
        conn: &Connection,
        property: Property,
        range: Option<&TimeRange>,
        unique: bool,
    ) -> Result<Aggregates> {
        let (start, end) = time_bounds(range);
        let unique_expr = if unique { "COUNT(DISTINCT ip)" } else { "0" };
        // Column names come from a closed enum
        let sql = format!(
            "SELECT {column}, COUNT(*), {unique_expr} FROM visits \
             WHERE time >= ?1 AND time <= ?2 GROUP BY {column}",
            column = property.column(),
            unique_expr = unique_expr,
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        let list = stmt
            .query_map(params![start, end], |row| {
                Ok(Aggregate {
                    id: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    total: count(row, 1)?,
                    unique: count(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Aggregates { list })
    }

    fn bucketed(
        &self,
        conn: &Connection,
        interval: i64,
        range: Option<&TimeRange>,
        unique: bool,
    ) -> Result<Intervals> {
        let width = interval
            .checked_mul(MILLIS_PER_SECOND)
            .filter(|width| *width > 0)
            .ok_or(Error::InvalidInterval(interval))?;

        let (start, end) = time_bounds(range);
        let unique_expr = if unique { "COUNT(DISTINCT ip)" } else { "0" };
        // Floor division, so times before the epoch fall into the bucket below them
        let sql = format!(
            "SELECT time - ((time % ?1) + ?1) % ?1 AS bucket, COUNT(*), {} FROM visits \
             WHERE time >= ?2 AND time <= ?3 GROUP BY bucket ORDER BY bucket",
            unique_expr,
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        let list = stmt
            .query_map(params![width, start, end], |row| {
                let bucket: i64 = row.get(0)?;
                Ok(Interval {
                    start: timestamp(bucket, 0)?,
                    end: timestamp(bucket.saturating_add(width), 0)?,
                    total: count(row, 1)?,
                    unique: count(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Intervals { list })
    }
}

impl QueryExecutor<Connection> for SqliteExecutor {
    fn query(&self, conn: &Connection, range: Option<&TimeRange>) -> Result<Analytics> {
        let (start, end) = time_bounds(range);
        let mut stmt = conn.prepare_cached(
            "SELECT time, event, path, ip, platform, refererDomain, countryCode \
             FROM visits WHERE time >= ?1 AND time <= ?2 ORDER BY time",
        )?;

        let list = stmt
            .query_map(params![start, end], |row| {
                Ok(Analytic {
                    time: timestamp(row.get(0)?, 0)?,
                    event: row.get(1)?,
                    path: row.get(2)?,
                    ip: row.get(3)?,
                    platform: row.get(4)?,
                    referer_domain: row.get(5)?,
                    country_code: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Analytics { list })
    }

    fn group_by(
        &self,
        conn: &Connection,
        property: Property,
        range: Option<&TimeRange>,
    ) -> Result<Aggregates> {
        self.grouped(conn, property, range, false)
    }

    fn group_by_unique(
        &self,
        conn: &Connection,
        property: Property,
        range: Option<&TimeRange>,
    ) -> Result<Aggregates> {
        self.grouped(conn, property, range, true)
    }

    fn series(&self, conn: &Connection, interval: i64, range: Option<&TimeRange>) -> Result<Intervals> {
        self.bucketed(conn, interval, range, false)
    }

    fn series_unique(
        &self,
        conn: &Connection,
        interval: i64,
        range: Option<&TimeRange>,
    ) -> Result<Intervals> {
        self.bucketed(conn, interval, range, true)
    }

    fn insert(&self, conn: &Connection, analytic: &Analytic) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO visits (time, event, path, ip, platform, refererDomain, countryCode) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        stmt.execute(params![
            analytic.time.timestamp_millis(),
            analytic.event,
            analytic.path,
            analytic.ip,
            analytic.platform,
            analytic.referer_domain,
            analytic.country_code,
        ])?;

        Ok(())
    }
}

const MILLIS_PER_SECOND: i64 = 1_000;

/// Range bounds as unix milliseconds, open ends widened to the full column range
fn time_bounds(range: Option<&TimeRange>) -> (i64, i64) {
    let start = range.and_then(|r| r.start).map_or(i64::MIN, |t| t.timestamp_millis());
    let end = range.and_then(|r| r.end).map_or(i64::MAX, |t| t.timestamp_millis());
    (start, end)
}

fn timestamp(millis: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

fn count(row: &Row<'_>, column: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(column)?;
    u64::try_from(value).map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(e)))
}
