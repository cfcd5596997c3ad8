//! Cache key normalization
//!
//! Two requests that can only differ in bounds lying outside a shard map to
//! the same key for that shard. Each key carries its shard integer so keys
//! for different shards never collide.

use std::collections::BTreeMap;
use url::{form_urlencoded, Url};

/// Query parameter marking a request as cacheable
pub const CACHE_PARAM: &str = "cache";

const START_PARAM: &str = "start";
const END_PARAM: &str = "end";
const SHARD_PARAM: &str = "shard";
const OP_PARAM: &str = "op";

/// Request inputs that change a shard result, folded into its key
///
/// Each entry replaces the URL parameter of the same name; `None` removes
/// it. The executed values therefore decide the key even when they were not
/// taken from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInputs {
    overrides: BTreeMap<&'static str, Option<String>>,
}

impl KeyInputs {
    /// Inputs of a request producing results of shape `kind`
    pub fn new(kind: &str) -> Self {
        Self::default().with(OP_PARAM, Some(kind))
    }

    /// Replace a URL parameter, or remove it when `value` is `None`
    pub fn with<V: ToString>(mut self, name: &'static str, value: Option<V>) -> Self {
        self.overrides.insert(name, value.map(|v| v.to_string()));
        self
    }
}

/// Build the cache key of `url` for one shard.
///
/// `inputs` are applied first. Then:
///
/// * `start` is dropped when the requested start month precedes the shard.
/// * `end` is dropped when the requested end month follows the shard.
/// * `cache` is dropped unless the shard is older than `now`.
/// * `shard` is set to the shard integer.
///
/// The remaining parameters are re-encoded with sorted keys, values keeping
/// their request order.
pub fn build_key(
    url: &Url,
    inputs: &KeyInputs,
    shard: u32,
    start: u32,
    end: u32,
    now: u32,
) -> String {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        params.entry(key.into_owned()).or_default().push(value.into_owned());
    }

    for (&name, value) in &inputs.overrides {
        match value {
            Some(value) => {
                params.insert(name.to_string(), vec![value.clone()]);
            }
            None => {
                params.remove(name);
            }
        }
    }

    if start < shard {
        params.remove(START_PARAM);
    }

    if end > shard {
        params.remove(END_PARAM);
    }

    if shard >= now {
        params.remove(CACHE_PARAM);
    }

    params.insert(SHARD_PARAM.to_string(), vec![shard.to_string()]);

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in &params {
        for value in values {
            serializer.append_pair(key, value);
        }
    }

    let mut key = url.clone();
    key.set_query(Some(&serializer.finish()));
    key.set_fragment(None);
    key.into()
}

/// Whether the caller asked for its shard results to be cached
pub fn is_cache_requested(url: &Url) -> bool {
    url.query_pairs()
        .find(|(key, _)| key == CACHE_PARAM)
        .map_or(false, |(_, value)| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u32 = 201610;

    fn url(query: &str) -> Url {
        Url::parse(&format!("http://localhost:7070/website/time?{}", query)).unwrap()
    }

    #[test]
    fn test_earlier_starts_collapse() {
        let a = build_key(&url("start=2015-01-01&cache=true"), &KeyInputs::default(), 201506, 201501, 999_999, NOW);
        let b = build_key(&url("start=2015-03-01&cache=true"), &KeyInputs::default(), 201506, 201503, 999_999, NOW);
        assert_eq!(a, b);
        assert!(!a.contains("start="));
    }

    #[test]
    fn test_later_ends_collapse() {
        let a = build_key(&url("end=2016-01-01"), &KeyInputs::default(), 201506, 0, 201601, NOW);
        let b = build_key(&url("end=2015-09-30"), &KeyInputs::default(), 201506, 0, 201509, NOW);
        assert_eq!(a, b);
        assert!(!a.contains("end="));
    }

    #[test]
    fn test_bounds_inside_shard_are_kept() {
        let a = build_key(&url("start=2015-06-10&end=2015-06-20"), &KeyInputs::default(), 201506, 201506, 201506, NOW);
        let b = build_key(&url("start=2015-06-11&end=2015-06-20"), &KeyInputs::default(), 201506, 201506, 201506, NOW);
        assert_ne!(a, b);
        assert!(a.contains("start=2015-06-10"));
        assert!(a.contains("end=2015-06-20"));
    }

    #[test]
    fn test_cache_marker_dropped_for_current_shard() {
        let past = build_key(&url("cache=true"), &KeyInputs::default(), 201609, 0, 999_999, NOW);
        assert!(past.contains("cache=true"));

        let current = build_key(&url("cache=true"), &KeyInputs::default(), NOW, 0, 999_999, NOW);
        assert!(!current.contains("cache"));

        // Uncached and cached requests for the open shard share a key
        let uncached = build_key(&url(""), &KeyInputs::default(), NOW, 0, 999_999, NOW);
        assert_eq!(current, uncached);
    }

    #[test]
    fn test_shard_parameter_replaced_and_canonical() {
        let key = build_key(&url("shard=1&z=2&a=1&a=0"), &KeyInputs::default(), 201506, 0, 999_999, NOW);
        assert_eq!(key, "http://localhost:7070/website/time?a=1&a=0&shard=201506&z=2");

        let other_shard = build_key(&url("z=2&a=1&a=0"), &KeyInputs::default(), 201507, 0, 999_999, NOW);
        assert_ne!(key, other_shard);
    }

    #[test]
    fn test_distinct_datasets_do_not_collide() {
        let a = Url::parse("http://localhost/website/time?cache=1").unwrap();
        let b = Url::parse("http://localhost/docs/time?cache=1").unwrap();
        assert_ne!(
            build_key(&a, &KeyInputs::default(), 201506, 0, 999_999, NOW),
            build_key(&b, &KeyInputs::default(), 201506, 0, 999_999, NOW)
        );
    }

    #[test]
    fn test_inputs_override_url_parameters() {
        let request = url("cache=1&unique=false");

        let paths = KeyInputs::new("aggregates")
            .with("property", Some("path"))
            .with("unique", Some(false));
        let events = KeyInputs::new("aggregates")
            .with("property", Some("event"))
            .with("unique", Some(false));
        let unique = paths.clone().with("unique", Some(true));

        let by_path = build_key(&request, &paths, 201506, 0, 999_999, NOW);
        assert_eq!(
            by_path,
            "http://localhost:7070/website/time?cache=1&op=aggregates&property=path&shard=201506&unique=false"
        );
        assert_ne!(by_path, build_key(&request, &events, 201506, 0, 999_999, NOW));
        assert_ne!(by_path, build_key(&request, &unique, 201506, 0, 999_999, NOW));

        let records = KeyInputs::new("analytics");
        assert_ne!(by_path, build_key(&request, &records, 201506, 0, 999_999, NOW));
    }

    #[test]
    fn test_input_bounds_replace_url_bounds() {
        // The URL claims no start, the executed range starts inside the shard
        let request = url("cache=1");
        let early = KeyInputs::new("analytics").with("start", Some("2015-06-10T00:00:00Z"));
        let late = KeyInputs::new("analytics").with("start", Some("2015-06-20T00:00:00Z"));

        assert_ne!(
            build_key(&request, &early, 201506, 201506, 999_999, NOW),
            build_key(&request, &late, 201506, 201506, 999_999, NOW)
        );

        // A start before the shard still collapses
        assert_eq!(
            build_key(&request, &early, 201507, 201506, 999_999, NOW),
            build_key(&request, &late, 201507, 201506, 999_999, NOW)
        );

        let unbounded = KeyInputs::new("analytics").with("start", None::<String>);
        let key = build_key(&url("start=2015-06-10"), &unbounded, 201506, 0, 999_999, NOW);
        assert!(!key.contains("start="));
    }

    #[test]
    fn test_is_cache_requested() {
        assert!(is_cache_requested(&url("cache=true")));
        assert!(is_cache_requested(&url("start=2015-01-01&cache=1")));
        assert!(!is_cache_requested(&url("cache=")));
        assert!(!is_cache_requested(&url("start=2015-01-01")));
    }
}
