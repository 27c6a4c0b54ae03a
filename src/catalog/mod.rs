//! Song catalog: loading, normalization and cluster assignment.
//!
//! The catalog is built exactly once at startup:
//!
//! 1. [`load_items`] reads the CSV item source into [`RawItem`](crate::models::RawItem) rows.
//! 2. [`ClusterAssigner`] fits a [`StandardScaler`] over the complete rows,
//!    partitions them with [`KMeans`] and labels each one.
//! 3. The resulting [`FeatureStore`] is immutable and shared by reference
//!    with every request.
//!
//! Rows with any missing feature are kept in the store for listing but carry
//! no cluster label and never take part in recommendations.

mod assigner;
mod kmeans;
mod loader;
mod scaler;
mod store;

pub use assigner::ClusterAssigner;
pub use kmeans::{KMeans, KMeansFit};
pub use loader::{load_items, read_items};
pub use scaler::StandardScaler;
pub use store::FeatureStore;

use crate::Result;
use crate::config::{ClusterConfig, DatasetConfig};

/// Loads the dataset and assigns clusters in one step.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read and
/// [`Error::Data`](crate::Error::Data) if the rows cannot be clustered.
pub fn build_feature_store(dataset: &DatasetConfig, clustering: ClusterConfig) -> Result<FeatureStore> {
    let rows = load_items(dataset)?;
    ClusterAssigner::new(clustering).assign(rows, dataset.feature_columns.clone())
}
