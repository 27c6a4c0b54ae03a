//! In-cluster similarity recommendations.

use super::cosine_similarity;
use crate::catalog::FeatureStore;
use crate::models::{DatasetInfo, Recommendation, ScoredSong, SongSummary};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Answers recommendation, listing and statistics requests.
///
/// Cheap to clone; all clones share the same read-only store.
#[derive(Debug, Clone)]
pub struct RecommendationService {
    store: Arc<FeatureStore>,
}

/// A candidate peer during ranking.
struct Candidate {
    position: usize,
    similarity: Option<f64>,
}

impl RecommendationService {
    /// Creates a service over a built feature store.
    #[must_use]
    pub const fn new(store: Arc<FeatureStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    /// Recommends up to `count` songs from the query song's cluster.
    ///
    /// Peers are ranked by cosine similarity to the query, most similar first;
    /// equal similarities keep load order. Peers whose similarity is undefined
    /// (zero vectors) score 0 and rank after every other peer. Items sharing
    /// the query's name are never returned. Fewer than `count` results are
    /// returned when the cluster is small; `count == 0` yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the song is unknown or unlabeled.
    #[instrument(skip(self), fields(result_count = tracing::field::Empty))]
    pub fn recommend(&self, song_name: &str, count: usize) -> Result<Recommendation> {
        let start = Instant::now();
        let result = self.rank(song_name, count);

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("cadence_recommend_total", "status" => status).increment(1);
        metrics::histogram!("cadence_recommend_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        if let Ok(ref recommendation) = result {
            tracing::Span::current().record("result_count", recommendation.len());
            debug!(results = recommendation.len(), "Computed recommendations");
        }
        result
    }

    fn rank(&self, song_name: &str, count: usize) -> Result<Recommendation> {
        let store = &*self.store;
        let position = store
            .position(song_name)
            .ok_or_else(|| Error::NotFound(format!("song '{song_name}' not found in dataset")))?;
        let query = &store.items()[position];

        let (Some(cluster), Some(query_vector)) = (query.cluster, query.features.as_deref()) else {
            return Err(Error::NotFound(format!(
                "song '{song_name}' has incomplete features and no cluster"
            )));
        };

        if count == 0 {
            return Ok(Recommendation {
                original_song: song_name.to_string(),
                recommendations: Vec::new(),
            });
        }

        let mut candidates: Vec<Candidate> = store
            .members(cluster)
            .filter(|(_, peer)| peer.name != query.name)
            .map(|(position, peer)| Candidate {
                position,
                similarity: peer
                    .features
                    .as_deref()
                    .and_then(|v| cosine_similarity(query_vector, v)),
            })
            .collect();

        // Stable sort: equal keys keep load order.
        candidates.sort_by(compare_candidates);

        let recommendations = candidates
            .into_iter()
            .take(count)
            .map(|c| ScoredSong {
                song: store.items()[c.position].summary(),
                similarity: c.similarity.unwrap_or(0.0),
            })
            .collect();

        Ok(Recommendation {
            original_song: song_name.to_string(),
            recommendations,
        })
    }

    /// Every song in load order, for autocomplete.
    #[must_use]
    pub fn list_items(&self) -> Vec<SongSummary> {
        self.store.items().iter().map(crate::models::Item::summary).collect()
    }

    /// Catalog statistics.
    #[must_use]
    pub fn dataset_info(&self) -> DatasetInfo {
        let cluster_distribution = self.store.cluster_sizes();
        DatasetInfo {
            total_songs: self.store.len(),
            clusters: cluster_distribution.len(),
            features: self.store.feature_names().len(),
            unlabeled_songs: self.store.unlabeled_count(),
            cluster_distribution,
        }
    }
}

/// Defined similarities first (highest first), undefined ones last.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.similarity, b.similarity) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
