//! Records, per-operation results and request parameters

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// A single analytics record
///
/// The timestamp alone decides which shard the record is written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytic {
    /// When the event happened, stored with millisecond precision
    pub time: DateTime<Utc>,
    /// Event type (e.g. "pageview")
    #[serde(default)]
    pub event: String,
    /// Requested path
    #[serde(default)]
    pub path: String,
    /// Client IP, used for unique counts
    #[serde(default)]
    pub ip: String,
    /// Client platform
    #[serde(default)]
    pub platform: String,
    /// Referring domain
    #[serde(default)]
    pub referer_domain: String,
    /// ISO country code
    #[serde(default)]
    pub country_code: String,
}

impl Analytic {
    /// Create a record with empty dimensions
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            event: String::new(),
            path: String::new(),
            ip: String::new(),
            platform: String::new(),
            referer_domain: String::new(),
            country_code: String::new(),
        }
    }

    /// Set the event type
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Set the path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the client IP
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    /// Set the platform
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the referring domain
    pub fn with_referer_domain(mut self, domain: impl Into<String>) -> Self {
        self.referer_domain = domain.into();
        self
    }

    /// Set the country code
    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    /// Value of a group-by dimension
    pub fn property(&self, property: Property) -> &str {
        match property {
            Property::Event => &self.event,
            Property::Path => &self.path,
            Property::Ip => &self.ip,
            Property::Platform => &self.platform,
            Property::RefererDomain => &self.referer_domain,
            Property::CountryCode => &self.country_code,
        }
    }
}

/// Flat list of records returned by `query`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub list: Vec<Analytic>,
}

/// Count of records sharing one group id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Value of the grouped property
    pub id: String,
    /// Number of records
    pub total: u64,
    /// Number of distinct IPs, zero unless requested
    pub unique: u64,
}

/// Grouped counts returned by `group_by`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregates {
    pub list: Vec<Aggregate>,
}

/// Count of records in one time bucket of a shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Bucket start (inclusive)
    pub start: DateTime<Utc>,
    /// Bucket end (exclusive)
    pub end: DateTime<Utc>,
    /// Number of records
    pub total: u64,
    /// Number of distinct IPs, zero unless requested
    pub unique: u64,
}

/// Time buckets returned by `series`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervals {
    pub list: Vec<Interval>,
}

/// Dimension a `group_by` request aggregates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    Event,
    Path,
    Ip,
    Platform,
    RefererDomain,
    CountryCode,
}

impl Property {
    /// Column holding this dimension in a shard database
    pub fn column(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Path => "path",
            Self::Ip => "ip",
            Self::Platform => "platform",
            Self::RefererDomain => "refererDomain",
            Self::CountryCode => "countryCode",
        }
    }

    /// All dimensions
    pub fn all() -> [Self; 6] {
        [
            Self::Event,
            Self::Path,
            Self::Ip,
            Self::Platform,
            Self::RefererDomain,
            Self::CountryCode,
        ]
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Property {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|property| property.column() == s)
            .ok_or_else(|| Error::InvalidProperty(s.to_string()))
    }
}

/// Requested time range, both bounds optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start time (inclusive)
    pub start: Option<DateTime<Utc>>,
    /// End time (inclusive)
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Range with both bounds
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// Range open towards the future
    pub fn since(start: DateTime<Utc>) -> Self {
        Self::new(Some(start), None)
    }

    /// Range open towards the past
    pub fn until(end: DateTime<Utc>) -> Self {
        Self::new(None, Some(end))
    }

    /// Parse request bounds.
    ///
    /// Accepts RFC 3339 timestamps or `YYYY-MM-DD` dates. A date-only end
    /// covers the whole day. Unparsable bounds are treated as absent.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.and_then(|s| parse_bound(s, false)),
            end: end.and_then(|s| parse_bound(s, true)),
        }
    }

    /// Whether neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a timestamp falls inside the range
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| *timestamp >= start)
            && self.end.map_or(true, |end| *timestamp <= end)
    }
}

fn parse_bound(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

/// Parameters of a single driver request
#[derive(Debug, Clone)]
pub struct Params {
    /// Dataset name
    pub dataset: String,
    /// Original request URL, source of the cache key
    pub url: Url,
    /// Requested time range
    pub time_range: Option<TimeRange>,
    /// Group-by dimension
    pub property: Option<Property>,
    /// Series bucket width in seconds
    pub interval: Option<i64>,
    /// Whether to count distinct IPs
    pub unique: bool,
}

impl Params {
    /// Create parameters for a dataset and request URL
    pub fn new(dataset: impl Into<String>, url: Url) -> Self {
        Self {
            dataset: dataset.into(),
            url,
            time_range: None,
            property: None,
            interval: None,
            unique: false,
        }
    }

    /// Read every request input from the query string of `url`.
    ///
    /// `start` and `end` follow [`TimeRange::parse`], `property` must name a
    /// dimension, `interval` is a number of seconds and `unique` is set by
    /// `true` or `1`.
    pub fn from_url(dataset: impl Into<String>, url: Url) -> Result<Self> {
        let mut start = None;
        let mut end = None;
        let mut property = None;
        let mut interval = None;
        let mut unique = false;

        for (key, value) in url.query_pairs() {
            match &*key {
                "start" => start = Some(value.into_owned()),
                "end" => end = Some(value.into_owned()),
                "property" => property = Some(value.parse::<Property>()?),
                "interval" => {
                    let seconds = value
                        .parse::<i64>()
                        .map_err(|_| Error::InvalidInterval(0))?;
                    interval = Some(seconds);
                }
                "unique" => unique = matches!(&*value, "true" | "1"),
                _ => {}
            }
        }

        let range = TimeRange::parse(start.as_deref(), end.as_deref());

        Ok(Self {
            dataset: dataset.into(),
            url,
            time_range: (!range.is_unbounded()).then_some(range),
            property,
            interval,
            unique,
        })
    }

    /// Set the time range
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// Set the group-by property
    pub fn with_property(mut self, property: Property) -> Self {
        self.property = Some(property);
        self
    }

    /// Set the series interval in seconds
    pub fn with_interval(mut self, seconds: i64) -> Self {
        self.interval = Some(seconds);
        self
    }

    /// Set whether distinct IPs are counted
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_property_parsing() {
        assert_eq!("refererDomain".parse::<Property>().unwrap(), Property::RefererDomain);
        assert_eq!("countryCode".parse::<Property>().unwrap(), Property::CountryCode);
        assert!(matches!("browser".parse::<Property>(), Err(Error::InvalidProperty(_))));
        assert!("referer_domain".parse::<Property>().is_err());

        for property in Property::all() {
            assert_eq!(property.to_string().parse::<Property>().unwrap(), property);
        }
    }

    #[test]
    fn test_time_range_parse() {
        let range = TimeRange::parse(Some("2015-12-01"), Some("2015-12-31"));
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2015, 12, 1, 0, 0, 0).unwrap()));
        let last_milli = Utc.with_ymd_and_hms(2015, 12, 31, 23, 59, 59).unwrap() + chrono::Duration::milliseconds(999);
        assert_eq!(range.end, Some(last_milli));

        let range = TimeRange::parse(Some("2015-12-08T10:00:00+02:00"), None);
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2015, 12, 8, 8, 0, 0).unwrap()));
        assert_eq!(range.end, None);

        let range = TimeRange::parse(Some("yesterday"), Some("2015-02-30"));
        assert!(range.is_unbounded());
    }

    #[test]
    fn test_time_range_contains() {
        let range = TimeRange::parse(Some("2015-12-01"), Some("2015-12-31"));
        assert!(range.contains(&Utc.with_ymd_and_hms(2015, 12, 31, 12, 0, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap()));
        assert!(TimeRange::default().contains(&Utc::now()));
    }

    #[test]
    fn test_params_from_url() -> Result<()> {
        let url = Url::parse(
            "http://localhost/website/group?cache=1&start=2015-11-01&property=path&unique=true&interval=3600",
        )
        .unwrap();
        let params = Params::from_url("website", url)?;

        assert_eq!(params.dataset, "website");
        assert_eq!(params.property, Some(Property::Path));
        assert_eq!(params.interval, Some(3600));
        assert!(params.unique);
        let range = params.time_range.unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2015, 11, 1, 0, 0, 0).unwrap()));
        assert_eq!(range.end, None);

        let plain = Params::from_url("website", Url::parse("http://localhost/website/query").unwrap())?;
        assert!(plain.time_range.is_none());
        assert!(!plain.unique);

        let bad = Url::parse("http://localhost/website/group?property=browser").unwrap();
        assert!(matches!(Params::from_url("website", bad), Err(Error::InvalidProperty(_))));

        let bad = Url::parse("http://localhost/website/series?interval=hourly").unwrap();
        assert!(matches!(Params::from_url("website", bad), Err(Error::InvalidInterval(0))));
        Ok(())
    }

    #[test]
    fn test_analytic_serialization() -> Result<()> {
        let analytic = Analytic::new(Utc.with_ymd_and_hms(2015, 12, 8, 0, 0, 0).unwrap())
            .with_event("pageview")
            .with_referer_domain("example.com");

        let json = serde_json::to_value(&analytic)?;
        assert_eq!(json["refererDomain"], "example.com");
        assert_eq!(json["event"], "pageview");

        let back: Analytic = serde_json::from_value(json)?;
        assert_eq!(back, analytic);
        assert_eq!(back.property(Property::RefererDomain), "example.com");
        Ok(())
    }
}
