//! Cache key normalization and per-shard merge benchmarks

use std::sync::Arc;

use cocoon_analytics::cache::{build_key, KeyInputs};
use cocoon_analytics::driver::merge_aggregates;
use cocoon_analytics::{Aggregate, Aggregates};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use url::Url;

fn bench_build_key(c: &mut Criterion) {
    let url = Url::parse(
        "http://localhost/api/website/group/path?cache=1&start=2015-10-05&end=2016-02-01&unique=true",
    )
    .unwrap();
    let inputs = KeyInputs::new("aggregates")
        .with("property", Some("path"))
        .with("unique", Some(true));

    let mut group = c.benchmark_group("build_key");
    for shard in [201510u32, 201512, 201602] {
        group.bench_with_input(BenchmarkId::from_parameter(shard), &shard, |b, &shard| {
            b.iter(|| build_key(black_box(&url), &inputs, shard, 201510, 201602, 201601))
        });
    }
    group.finish();
}

fn shard_aggregates(shards: usize, ids: usize, seed: u64) -> Vec<Arc<Aggregates>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..shards)
        .map(|_| {
            let list = (0..ids)
                .map(|id| Aggregate {
                    id: format!("/page/{}", id),
                    total: rng.gen_range(1..10_000),
                    unique: rng.gen_range(0..1_000),
                })
                .collect();
            Arc::new(Aggregates { list })
        })
        .collect()
}

fn bench_merge_aggregates(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_aggregates");
    for shards in [1usize, 12, 60] {
        let parts = shard_aggregates(shards, 500, 42);
        group.bench_with_input(BenchmarkId::from_parameter(shards), &parts, |b, parts| {
            b.iter(|| merge_aggregates(black_box(parts)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_key, bench_merge_aggregates);
criterion_main!(benches);
