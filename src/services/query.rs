//! Request handling: validation plus query logging around recommendations.

use super::RecommendationService;
use crate::models::{NewQueryLogEntry, Recommendation};
use crate::storage::QueryLogBackend;
use crate::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// Query text logged for requests without a song name.
pub const EMPTY_QUERY_PLACEHOLDER: &str = "(empty)";

/// A recommendation request as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecommendRequest {
    /// Song to find neighbours for. Surrounding whitespace is ignored.
    #[serde(default)]
    pub song_name: String,
    /// Requested number of results; the configured default when absent.
    #[serde(default)]
    pub num_recommendations: Option<i64>,
}

impl RecommendRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(song_name: impl Into<String>, num_recommendations: Option<i64>) -> Self {
        Self {
            song_name: song_name.into(),
            num_recommendations,
        }
    }
}

/// Validates requests, runs them and records each one in the query log.
///
/// Query log failures are logged and never fail the request.
#[derive(Clone)]
pub struct QueryService {
    recommender: RecommendationService,
    query_log: Option<Arc<dyn QueryLogBackend>>,
    default_count: usize,
}

impl QueryService {
    /// Creates a query service.
    #[must_use]
    pub fn new(
        recommender: RecommendationService,
        query_log: Option<Arc<dyn QueryLogBackend>>,
        default_count: usize,
    ) -> Self {
        Self {
            recommender,
            query_log,
            default_count,
        }
    }

    /// Handles one recommendation request.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the song name is empty or the count negative
    /// - [`Error::NotFound`] if the song is unknown or unlabeled
    pub fn recommend(&self, request: &RecommendRequest) -> Result<Recommendation> {
        let song_name = request.song_name.trim();
        if song_name.is_empty() {
            self.log(&NewQueryLogEntry::failed(EMPTY_QUERY_PLACEHOLDER));
            return Err(Error::Validation("song name is required".to_string()));
        }

        let result = self
            .resolve_count(request.num_recommendations)
            .and_then(|count| self.recommender.recommend(song_name, count));

        let entry = match &result {
            Ok(recommendation) => NewQueryLogEntry::succeeded(song_name, recommendation.len()),
            Err(_) => NewQueryLogEntry::failed(song_name),
        };
        self.log(&entry);

        result
    }

    /// The wrapped recommendation service.
    #[must_use]
    pub const fn recommender(&self) -> &RecommendationService {
        &self.recommender
    }

    fn resolve_count(&self, requested: Option<i64>) -> Result<usize> {
        match requested {
            None => Ok(self.default_count),
            Some(n) => usize::try_from(n).map_err(|_| {
                Error::Validation(format!(
                    "num_recommendations must be a non-negative integer, got {n}"
                ))
            }),
        }
    }

    fn log(&self, entry: &NewQueryLogEntry) {
        let Some(query_log) = &self.query_log else {
            return;
        };
        if let Err(e) = query_log.record(entry) {
            warn!(error = %e, query = %entry.query, "Failed to record query");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FeatureStore;
    use crate::models::{ClusterId, Item, QueryLogEntry};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryLog {
        entries: Mutex<Vec<NewQueryLogEntry>>,
        fail: bool,
    }

    impl QueryLogBackend for MemoryLog {
        fn record(&self, entry: &NewQueryLogEntry) -> Result<i64> {
            if self.fail {
                return Err(Error::io("record_query", "disk full"));
            }
            let mut entries = self.entries.lock().unwrap();
            entries.push(entry.clone());
            Ok(i64::try_from(entries.len()).unwrap())
        }

        fn recent(&self, _limit: usize) -> Result<Vec<QueryLogEntry>> {
            Ok(Vec::new())
        }

        fn count(&self) -> Result<u64> {
            Ok(self.entries.lock().unwrap().len() as u64)
        }
    }

    fn recommender() -> RecommendationService {
        let items = (0..8)
            .map(|i| Item::labeled(format!("song {i}"), vec![1.0, f64::from(i)], ClusterId::new(0)))
            .collect();
        let store = FeatureStore::from_labeled(items, vec!["a".into(), "b".into()], 1).unwrap();
        RecommendationService::new(Arc::new(store))
    }

    fn service(log: &Arc<MemoryLog>) -> QueryService {
        let backend: Arc<dyn QueryLogBackend> = Arc::clone(log) as Arc<dyn QueryLogBackend>;
        QueryService::new(recommender(), Some(backend), 5)
    }

    #[test]
    fn test_default_count_applied() {
        let log = Arc::new(MemoryLog::default());
        let result = service(&log).recommend(&RecommendRequest::new("song 0", None)).unwrap();
        assert_eq!(result.len(), 5);

        let entries = log.entries.lock().unwrap();
        assert_eq!(entries.as_slice(), &[NewQueryLogEntry::succeeded("song 0", 5)]);
    }

    #[test]
    fn test_name_is_trimmed() {
        let log = Arc::new(MemoryLog::default());
        let result = service(&log)
            .recommend(&RecommendRequest::new("  song 1  ", Some(2)))
            .unwrap();
        assert_eq!(result.original_song, "song 1");
        assert_eq!(log.entries.lock().unwrap()[0].query, "song 1");
    }

    #[test]
    fn test_empty_name_is_validation_error_and_logged() {
        let log = Arc::new(MemoryLog::default());
        let result = service(&log).recommend(&RecommendRequest::new("   ", Some(3)));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(
            log.entries.lock().unwrap().as_slice(),
            &[NewQueryLogEntry::failed(EMPTY_QUERY_PLACEHOLDER)]
        );
    }

    #[test]
    fn test_negative_count_is_validation_error() {
        let log = Arc::new(MemoryLog::default());
        let result = service(&log).recommend(&RecommendRequest::new("song 0", Some(-1)));
        assert!(matches!(result, Err(Error::Validation(msg)) if msg.contains("-1")));
        assert!(!log.entries.lock().unwrap()[0].success);
    }

    #[test]
    fn test_zero_count_is_empty_success() {
        let log = Arc::new(MemoryLog::default());
        let result = service(&log).recommend(&RecommendRequest::new("song 0", Some(0))).unwrap();
        assert!(result.is_empty());
        assert!(log.entries.lock().unwrap()[0].success);
    }

    #[test]
    fn test_not_found_is_logged_as_failure() {
        let log = Arc::new(MemoryLog::default());
        let result = service(&log).recommend(&RecommendRequest::new("unknown_song", Some(5)));
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(
            log.entries.lock().unwrap().as_slice(),
            &[NewQueryLogEntry::failed("unknown_song")]
        );
    }

    #[test]
    fn test_log_failure_does_not_fail_request() {
        let log = Arc::new(MemoryLog {
            fail: true,
            ..MemoryLog::default()
        });
        let result = service(&log).recommend(&RecommendRequest::new("song 0", Some(1)));
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn test_without_query_log() {
        let svc = QueryService::new(recommender(), None, 2);
        assert_eq!(svc.recommend(&RecommendRequest::new("song 3", None)).unwrap().len(), 2);
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let request: RecommendRequest =
            serde_json::from_str(r#"{"song_name": "song 2", "num_recommendations": 3}"#).unwrap();
        assert_eq!(request, RecommendRequest::new("song 2", Some(3)));

        let request: RecommendRequest = serde_json::from_str(r#"{"song_name": "x"}"#).unwrap();
        assert_eq!(request.num_recommendations, None);
    }
}
