//! Benchmarks for clustering and recommendation.
//!
//! Uses a synthetic 1,000-song catalog with four features, matching the
//! default feature set.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use cadence::catalog::ClusterAssigner;
use cadence::config::ClusterConfig;
use cadence::models::{ItemMetadata, RawItem};
use cadence::services::RecommendationService;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

const FEATURES: [&str; 4] = ["danceability", "energy", "tempo", "Valence"];

/// Deterministic pseudo-random catalog (64-bit LCG).
fn synthetic_catalog(n: usize) -> Vec<RawItem> {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        f64::from(u32::try_from(state >> 40).unwrap_or(0)) / f64::from(1u32 << 24)
    };

    (0..n)
        .map(|i| RawItem {
            name: format!("song {i}"),
            features: vec![Some(next()), Some(next()), Some(60.0 + next() * 120.0), Some(next())],
            metadata: ItemMetadata::default(),
        })
        .collect()
}

fn feature_names() -> Vec<String> {
    FEATURES.iter().map(ToString::to_string).collect()
}

fn bench_cluster_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_assignment");
    let rows = synthetic_catalog(1_000);

    for k in [4usize, 8, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            let assigner = ClusterAssigner::new(ClusterConfig::with_k(k));
            b.iter(|| {
                black_box(assigner.assign(rows.clone(), feature_names()).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");
    let store = ClusterAssigner::new(ClusterConfig::with_k(4))
        .assign(synthetic_catalog(1_000), feature_names())
        .unwrap();
    let service = RecommendationService::new(Arc::new(store));

    for count in [5usize, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(service.recommend("song 500", count).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cluster_assignment, bench_recommend);
criterion_main!(benches);
