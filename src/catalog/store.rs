//! Immutable feature store.

use super::StandardScaler;
use crate::models::{ClusterId, Item};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// The loaded catalog with normalized features and cluster labels.
///
/// Built once at startup and never mutated, so it can be shared behind an
/// `Arc` and read concurrently without locking.
///
/// # Invariants
///
/// - An item has a cluster label if and only if it has a feature vector.
/// - Every label is in `[0, k)` and every vector has `feature_names.len()` entries.
/// - Name lookup resolves to the first occurrence in load order.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    items: Vec<Item>,
    feature_names: Vec<String>,
    k: usize,
    scaler: Option<StandardScaler>,
    by_name: HashMap<String, usize>,
}

impl FeatureStore {
    /// Builds a store from already normalized, labeled items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Data`] if any invariant listed on [`FeatureStore`] is violated.
    pub fn from_labeled(items: Vec<Item>, feature_names: Vec<String>, k: usize) -> Result<Self> {
        let dims = feature_names.len();
        for item in &items {
            match (&item.features, item.cluster) {
                (Some(features), Some(cluster)) => {
                    if features.len() != dims {
                        return Err(Error::Data(format!(
                            "item '{}' has {} features, expected {dims}",
                            item.name,
                            features.len()
                        )));
                    }
                    if cluster.get() >= k {
                        return Err(Error::Data(format!(
                            "item '{}' has cluster {cluster}, expected < {k}",
                            item.name
                        )));
                    }
                },
                (None, None) => {},
                _ => {
                    return Err(Error::Data(format!(
                        "item '{}' must have both a feature vector and a cluster label or neither",
                        item.name
                    )));
                },
            }
        }

        let mut by_name = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            by_name.entry(item.name.clone()).or_insert(position);
        }

        Ok(Self {
            items,
            feature_names,
            k,
            scaler: None,
            by_name,
        })
    }

    /// Attaches the frozen normalization parameters used to build the vectors.
    #[must_use]
    pub fn with_scaler(mut self, scaler: StandardScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// All items in load order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of items, labeled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the store holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured number of clusters.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// Feature dimension names, in vector order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Normalization parameters, if the store was built by the assigner.
    #[must_use]
    pub const fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    /// Load-order position of the first item with this name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// First item with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Item> {
        self.position(name).map(|i| &self.items[i])
    }

    /// Items in `cluster`, with their load-order positions.
    pub fn members(&self, cluster: ClusterId) -> impl Iterator<Item = (usize, &Item)> {
        self.items
            .iter()
            .enumerate()
            .filter(move |(_, item)| item.cluster == Some(cluster))
    }

    /// Number of items per cluster label in use, ordered by label.
    #[must_use]
    pub fn cluster_sizes(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for cluster in self.items.iter().filter_map(|item| item.cluster) {
            *sizes.entry(cluster.get()).or_insert(0) += 1;
        }
        sizes
    }

    /// Number of items excluded from clustering.
    #[must_use]
    pub fn unlabeled_count(&self) -> usize {
        self.items.iter().filter(|item| item.cluster.is_none()).count()
    }
}
