//! Recommendation results and catalog statistics.

use super::SongSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recommended song with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSong {
    /// The recommended song.
    #[serde(flatten)]
    pub song: SongSummary,
    /// Cosine similarity to the query vector, in `[-1, 1]`.
    pub similarity: f64,
}

/// Result of a `recommend` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The query song name.
    pub original_song: String,
    /// Ranked recommendations, most similar first.
    pub recommendations: Vec<ScoredSong>,
}

impl Recommendation {
    /// Returns the number of recommended songs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recommendations.len()
    }

    /// Returns `true` if nothing was recommended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    /// Returns the recommended song names in rank order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.recommendations
            .iter()
            .map(|r| r.song.song_name.as_str())
            .collect()
    }
}

/// Catalog statistics reported by `dataset_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Number of loaded items, labeled or not.
    pub total_songs: usize,
    /// Number of distinct cluster labels in use.
    pub clusters: usize,
    /// Number of feature dimensions.
    pub features: usize,
    /// Items excluded from clustering because of missing features.
    pub unlabeled_songs: usize,
    /// Item count per cluster label, ordered by label.
    pub cluster_distribution: BTreeMap<usize, usize>,
}
