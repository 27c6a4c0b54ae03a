//! Business logic services.
//!
//! Services read the immutable [`FeatureStore`](crate::catalog::FeatureStore)
//! and the query log; they never mutate the catalog.

mod container;
mod query;
mod recommendation;
mod similarity;

pub use container::ServiceContainer;
pub use query::{EMPTY_QUERY_PLACEHOLDER, QueryService, RecommendRequest};
pub use recommendation::RecommendationService;
pub use similarity::cosine_similarity;
