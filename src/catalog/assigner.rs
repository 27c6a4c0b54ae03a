//! One-shot offline cluster assignment.

use super::{FeatureStore, KMeans, StandardScaler};
use crate::config::ClusterConfig;
use crate::models::{ClusterId, Item, RawItem};
use crate::{Error, Result};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Normalizes the catalog's features and partitions it into `k` clusters.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAssigner {
    config: ClusterConfig,
}

impl ClusterAssigner {
    /// Creates an assigner with fixed clustering parameters.
    #[must_use]
    pub const fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Builds the feature store from raw rows.
    ///
    /// Rows with any missing feature are excluded from the scaler statistics
    /// and from clustering; they stay in the store without a label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Data`] if no row has a complete feature vector, if `k`
    /// exceeds the number of complete rows, or if a row's feature count does
    /// not match `feature_names`.
    #[instrument(skip(self, rows, feature_names), fields(rows = rows.len(), k = self.config.k))]
    pub fn assign(&self, rows: Vec<RawItem>, feature_names: Vec<String>) -> Result<FeatureStore> {
        let start = Instant::now();
        let dims = feature_names.len();

        if let Some(bad) = rows.iter().find(|r| r.features.len() != dims) {
            return Err(Error::Data(format!(
                "row '{}' has {} feature values, expected {dims}",
                bad.name,
                bad.features.len()
            )));
        }

        let (positions, complete): (Vec<usize>, Vec<Vec<f64>>) = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.complete_features().map(|f| (i, f)))
            .unzip();

        if complete.is_empty() {
            return Err(Error::Data(
                "no items with a complete feature vector after excluding missing values".to_string(),
            ));
        }
        if self.config.k > complete.len() {
            return Err(Error::Data(format!(
                "k = {} exceeds the {} items with complete features",
                self.config.k,
                complete.len()
            )));
        }

        let scaler = StandardScaler::fit(&complete)?;
        let normalized: Vec<Vec<f64>> = complete.iter().map(|row| scaler.transform(row)).collect();

        let fit = KMeans::new(self.config.k)
            .with_max_iter(self.config.max_iter)
            .with_tol(self.config.tolerance)
            .with_seed(self.config.seed)
            .fit(&normalized)?;
        debug!(n_iter = fit.n_iter, inertia = fit.inertia, "K-means converged");

        let mut assigned: Vec<Option<(Vec<f64>, ClusterId)>> = vec![None; rows.len()];
        for ((position, vector), label) in positions.into_iter().zip(normalized).zip(fit.labels) {
            assigned[position] = Some((vector, ClusterId::new(label)));
        }

        let excluded = rows.len() - complete.len();
        let items = rows
            .into_iter()
            .zip(assigned)
            .map(|(row, slot)| match slot {
                Some((vector, cluster)) => {
                    Item::labeled(row.name, vector, cluster).with_metadata(row.metadata)
                },
                None => Item::unlabeled(row.name).with_metadata(row.metadata),
            })
            .collect();

        let store = FeatureStore::from_labeled(items, feature_names, self.config.k)?.with_scaler(scaler);

        info!(
            items = store.len(),
            clustered = store.len() - excluded,
            excluded,
            k = self.config.k,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Assigned clusters"
        );
        for (cluster, size) in store.cluster_sizes() {
            debug!(cluster, size, "Cluster size");
        }

        Ok(store)
    }
}
