//! Catalog item types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster label in `[0, k)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(usize);

impl ClusterId {
    /// Creates a cluster label.
    #[must_use]
    pub const fn new(label: usize) -> Self {
        Self(label)
    }

    /// Returns the raw label value.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive metadata carried through but never used in computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Release date as it appears in the source data.
    pub released_date: Option<String>,
    /// Performing singer.
    pub singer: Option<String>,
}

/// A row as read from the tabular item source, before normalization.
///
/// `features[i]` is `None` when the source cell was empty or not numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    /// Song name (lookup key).
    pub name: String,
    /// Raw feature values in feature-column order.
    pub features: Vec<Option<f64>>,
    /// Descriptive metadata.
    pub metadata: ItemMetadata,
}

impl RawItem {
    /// Returns the feature values if every dimension is present.
    #[must_use]
    pub fn complete_features(&self) -> Option<Vec<f64>> {
        self.features.iter().copied().collect()
    }
}

/// A catalog item after cluster assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Song name (lookup key; the first occurrence wins on duplicates).
    pub name: String,
    /// Normalized feature vector, `None` when any raw feature was missing.
    pub features: Option<Vec<f64>>,
    /// Assigned cluster, `None` exactly when `features` is `None`.
    pub cluster: Option<ClusterId>,
    /// Descriptive metadata.
    pub metadata: ItemMetadata,
}

impl Item {
    /// Creates an item with a normalized vector and a cluster label.
    #[must_use]
    pub fn labeled(name: impl Into<String>, features: Vec<f64>, cluster: ClusterId) -> Self {
        Self {
            name: name.into(),
            features: Some(features),
            cluster: Some(cluster),
            metadata: ItemMetadata::default(),
        }
    }

    /// Creates an item that was excluded from clustering.
    #[must_use]
    pub fn unlabeled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: None,
            cluster: None,
            metadata: ItemMetadata::default(),
        }
    }

    /// Sets the descriptive metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ItemMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the public summary of this item.
    #[must_use]
    pub fn summary(&self) -> SongSummary {
        SongSummary {
            song_name: self.name.clone(),
            released_date: self.metadata.released_date.clone(),
            singer: self.metadata.singer.clone(),
        }
    }
}

/// Public view of a song: identifier plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSummary {
    /// Song name.
    pub song_name: String,
    /// Release date.
    pub released_date: Option<String>,
    /// Singer.
    pub singer: Option<String>,
}
