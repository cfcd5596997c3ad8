//! Combining per-shard results into one response

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Aggregate, Aggregates, Analytics, Intervals};

/// Concatenate records in shard order
pub fn concat_analytics(parts: &[Arc<Analytics>]) -> Analytics {
    let list = parts
        .iter()
        .flat_map(|part| part.list.iter().cloned())
        .collect();
    Analytics { list }
}

/// Sum totals and unique counts of equal ids across shards.
///
/// Iteration order of the output is unspecified.
pub fn merge_aggregates(parts: &[Arc<Aggregates>]) -> Aggregates {
    let mut merged: HashMap<&str, (u64, u64)> = HashMap::new();

    for aggregate in parts.iter().flat_map(|part| part.list.iter()) {
        let entry = merged.entry(aggregate.id.as_str()).or_default();
        entry.0 += aggregate.total;
        entry.1 += aggregate.unique;
    }

    let list = merged
        .into_iter()
        .map(|(id, (total, unique))| Aggregate {
            id: id.to_string(),
            total,
            unique,
        })
        .collect();

    Aggregates { list }
}

/// Concatenate time buckets in shard order
pub fn concat_intervals(parts: &[Arc<Intervals>]) -> Intervals {
    let list = parts
        .iter()
        .flat_map(|part| part.list.iter().cloned())
        .collect();
    Intervals { list }
}
