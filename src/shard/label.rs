//! Shard label implementation
//!
//! Converts timestamps into "YYYY-MM" shard labels and labels into the
//! YYYYMM integers used for ordering and range comparison.

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Datelike, Utc};

use crate::shard::{ShardError, ShardResult};

/// Highest year that still renders as a four digit label
const MAX_YEAR: i32 = 9999;

/// Label of a monthly shard
///
/// Ordering follows the calendar: `2015-01 < 2015-12 < 2016-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardLabel {
    year: i32,
    month: u32,
}

impl ShardLabel {
    /// Create a label from a year and a month (1-12)
    pub fn new(year: i32, month: u32) -> ShardResult<Self> {
        if !(0..=MAX_YEAR).contains(&year) {
            return Err(ShardError::invalid_label(format!("{}-{:02}", year, month)));
        }
        if !(1..=12).contains(&month) {
            return Err(ShardError::invalid_label(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Label of the month a timestamp falls in
    ///
    /// 2015-12-08T00:00:00Z -> 2015-12
    pub fn from_timestamp(timestamp: &DateTime<Utc>) -> ShardResult<Self> {
        Self::new(timestamp.year(), timestamp.month()).map_err(|_| {
            ShardError::timestamp_error(format!("No shard for timestamp {}", timestamp))
        })
    }

    /// Parse the integer form of a label
    ///
    /// 201512 -> 2015-12
    pub fn from_int(value: u32) -> ShardResult<Self> {
        Self::new((value / 100) as i32, value % 100)
            .map_err(|_| ShardError::invalid_label(value.to_string()))
    }

    /// Integer form of the label
    ///
    /// 2015-12 -> 201512
    pub fn to_int(&self) -> u32 {
        self.year as u32 * 100 + self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for ShardLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ShardLabel {
    type Err = ShardError;

    fn from_str(s: &str) -> ShardResult<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(ShardError::invalid_label(s));
        }

        let year = s[0..4]
            .parse::<i32>()
            .map_err(|_| ShardError::invalid_label(s))?;
        let month = s[5..7]
            .parse::<u32>()
            .map_err(|_| ShardError::invalid_label(s))?;

        Self::new(year, month).map_err(|_| ShardError::invalid_label(s))
    }
}

/// Shard label for a timestamp
pub fn label_for(timestamp: &DateTime<Utc>) -> ShardResult<ShardLabel> {
    ShardLabel::from_timestamp(timestamp)
}

/// Integer form of a "YYYY-MM" label
pub fn label_to_int(label: &str) -> ShardResult<u32> {
    label.parse::<ShardLabel>().map(|label| label.to_int())
}
