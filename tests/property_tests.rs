//! Property-based tests for clustering, ranking and retention.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Complete rows get exactly one label in `[0, k)`; incomplete rows get none
//! - A song is never recommended to itself
//! - Result counts are `min(n, peers)`
//! - Assignment and ranking are deterministic
//! - Rescaling a peer's vector does not change its rank
//! - Retention keeps exactly the newest `min(existing, keep)` snapshots

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use cadence::backup::{RetentionPolicy, Snapshotter, SqliteSnapshotter};
use cadence::catalog::{ClusterAssigner, FeatureStore};
use cadence::config::ClusterConfig;
use cadence::models::{ClusterId, Item, ItemMetadata, RawItem, SnapshotId};
use cadence::services::RecommendationService;
use chrono::{NaiveDate, TimeDelta};
use proptest::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const DIMS: usize = 3;

fn feature_names() -> Vec<String> {
    (0..DIMS).map(|i| format!("f{i}")).collect()
}

/// A feature cell: mostly present, occasionally missing.
fn cell() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        9 => (-100.0f64..100.0).prop_map(Some),
        1 => Just(None),
    ]
}

fn rows(max: usize) -> impl Strategy<Value = Vec<RawItem>> {
    prop::collection::vec(prop::collection::vec(cell(), DIMS), 1..max).prop_map(|cells| {
        cells
            .into_iter()
            .enumerate()
            .map(|(i, features)| RawItem {
                name: format!("song {i}"),
                features,
                metadata: ItemMetadata::default(),
            })
            .collect()
    })
}

fn complete_count(rows: &[RawItem]) -> usize {
    rows.iter().filter(|r| r.complete_features().is_some()).count()
}

fn assign(rows: Vec<RawItem>, k: usize) -> FeatureStore {
    ClusterAssigner::new(ClusterConfig::with_k(k))
        .assign(rows, feature_names())
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: labels exist exactly for complete rows and lie in `[0, k)`.
    #[test]
    fn prop_labels_cover_complete_rows(rows in rows(40), k in 1usize..5) {
        prop_assume!(complete_count(&rows) >= k);
        let complete: Vec<bool> = rows.iter().map(|r| r.complete_features().is_some()).collect();
        let store = assign(rows, k);

        for (item, complete) in store.items().iter().zip(complete) {
            match item.cluster {
                Some(cluster) => {
                    prop_assert!(complete);
                    prop_assert!(cluster.get() < k);
                    prop_assert!(item.features.is_some());
                },
                None => {
                    prop_assert!(!complete);
                    prop_assert!(item.features.is_none());
                },
            }
        }
    }

    /// Property: the query is excluded and the count is `min(n, cluster size - 1)`.
    #[test]
    fn prop_recommend_excludes_query_and_bounds_count(
        rows in rows(30),
        k in 1usize..4,
        n in 0usize..12,
    ) {
        prop_assume!(complete_count(&rows) >= k);
        let store = Arc::new(assign(rows, k));
        let sizes = store.cluster_sizes();
        let service = RecommendationService::new(Arc::clone(&store));

        for item in store.items() {
            let Some(cluster) = item.cluster else {
                prop_assert!(service.recommend(&item.name, n).is_err());
                continue;
            };
            let result = service.recommend(&item.name, n).unwrap();
            let peers = sizes[&cluster.get()] - 1;
            prop_assert_eq!(result.len(), n.min(peers));
            prop_assert!(!result.names().contains(&item.name.as_str()));
        }
    }

    /// Property: assignment and ranking are repeatable.
    #[test]
    fn prop_pipeline_is_deterministic(rows in rows(30), k in 1usize..4) {
        prop_assume!(complete_count(&rows) >= k);
        let first = assign(rows.clone(), k);
        let second = assign(rows, k);
        prop_assert_eq!(first.items(), second.items());

        let service = RecommendationService::new(Arc::new(first));
        for item in service.store().items().iter().filter(|i| i.cluster.is_some()) {
            let a = service.recommend(&item.name, 5).unwrap();
            let b = service.recommend(&item.name, 5).unwrap();
            prop_assert_eq!(a, b);
        }
    }

    /// Property: doubling one peer's vector leaves the ranking unchanged.
    #[test]
    fn prop_ranking_is_scale_invariant(
        vectors in prop::collection::vec(prop::collection::vec(0.5f64..10.0, DIMS), 3..12),
        scaled in any::<prop::sample::Index>(),
    ) {
        let build = |factor_at: Option<usize>| {
            let items = vectors
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let factor = if Some(i) == factor_at { 2.0 } else { 1.0 };
                    let v = v.iter().map(|x| x * factor).collect();
                    Item::labeled(format!("song {i}"), v, ClusterId::new(0))
                })
                .collect();
            RecommendationService::new(Arc::new(
                FeatureStore::from_labeled(items, feature_names(), 1).unwrap(),
            ))
        };

        // Never rescale the query itself.
        let peer = 1 + scaled.index(vectors.len() - 1);
        let before = build(None).recommend("song 0", vectors.len()).unwrap();
        let after = build(Some(peer)).recommend("song 0", vectors.len()).unwrap();
        prop_assert_eq!(before.names(), after.names());
    }

    /// Property: trimming keeps exactly the newest `min(existing, keep)` snapshots.
    #[test]
    fn prop_retention_keeps_newest(
        offsets in prop::collection::btree_set(0i64..10_000, 0..25),
        keep in 1usize..15,
    ) {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();
        let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();

        let ids: Vec<SnapshotId> = offsets
            .iter()
            .map(|&s| SnapshotId::new(base + TimeDelta::seconds(s), 0))
            .collect();
        for id in &ids {
            fs::write(backups.join(id.file_name("query_logs")), b"").unwrap();
        }

        let snapshotter = SqliteSnapshotter::new(dir.path().join("unused.db"), &backups, "query_logs");
        RetentionPolicy::new(keep).apply(&snapshotter, false).unwrap();

        let remaining: Vec<SnapshotId> = snapshotter.list().unwrap().into_iter().map(|s| s.id).collect();
        let expected = ids.len().min(keep);
        prop_assert_eq!(remaining.len(), expected);
        prop_assert_eq!(remaining.as_slice(), &ids[ids.len() - expected..]);
    }
}
