//! Time range pruning over shard integers
//!
//! Requested ranges are reduced to inclusive YYYYMM bounds so shards can be
//! compared without parsing dates again.

use chrono::{DateTime, Utc};

use crate::model::TimeRange;
use crate::shard::ShardLabel;

/// Lower bound used when a range has no usable start
pub const DEFAULT_START: u32 = 0;

/// Upper bound used when a range has no usable end
pub const DEFAULT_END: u32 = 999_999;

/// Resolve a requested range to inclusive `(start, end)` shard integers.
///
/// A missing range or bound takes its default. A bound that cannot be
/// expressed as a YYYYMM integer falls back to its default as well.
pub fn resolve_bounds(range: Option<&TimeRange>) -> (u32, u32) {
    let Some(range) = range else {
        return (DEFAULT_START, DEFAULT_END);
    };

    let start = range.start.as_ref().and_then(month_int).unwrap_or(DEFAULT_START);
    let end = range.end.as_ref().and_then(month_int).unwrap_or(DEFAULT_END);

    (start, end)
}

/// Inclusive membership test of a shard integer
pub fn in_range(shard: u32, start: u32, end: u32) -> bool {
    shard >= start && shard <= end
}

fn month_int(timestamp: &DateTime<Utc>) -> Option<u32> {
    ShardLabel::from_timestamp(timestamp).ok().map(|label| label.to_int())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_default_bounds() {
        assert_eq!(resolve_bounds(None), (0, 999_999));
        assert_eq!(resolve_bounds(Some(&TimeRange::default())), (0, 999_999));
    }

    #[test]
    fn test_partial_bounds() {
        let since = TimeRange::since(ts(2015, 3, 14));
        assert_eq!(resolve_bounds(Some(&since)), (201503, 999_999));

        let until = TimeRange::until(ts(2016, 1, 2));
        assert_eq!(resolve_bounds(Some(&until)), (0, 201601));

        let between = TimeRange::between(ts(2015, 12, 1), ts(2015, 12, 31));
        assert_eq!(resolve_bounds(Some(&between)), (201512, 201512));
    }

    #[test]
    fn test_unrepresentable_bound_falls_back() {
        let range = TimeRange::between(ts(2015, 6, 1), ts(10000, 1, 1));
        assert_eq!(resolve_bounds(Some(&range)), (201506, 999_999));

        let range = TimeRange::between(ts(-5, 1, 1), ts(2015, 6, 1));
        assert_eq!(resolve_bounds(Some(&range)), (0, 201506));
    }

    #[test]
    fn test_in_range_is_inclusive() {
        assert!(in_range(201512, 201512, 201512));
        assert!(in_range(201506, 201501, 201512));
        assert!(!in_range(201512, 201601, 201612));
        assert!(!in_range(201601, 201501, 201512));
        assert!(in_range(201601, DEFAULT_START, DEFAULT_END));
    }
}
