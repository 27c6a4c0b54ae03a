//! Query log records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of request recorded in the query log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// A `recommend` request.
    #[default]
    Recommendation,
}

impl QueryType {
    /// Returns the value stored in the `query_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recommendation => "recommendation",
        }
    }

    /// Parses a stored `query_type` value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recommendation" => Some(Self::Recommendation),
            _ => None,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query to append to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueryLogEntry {
    /// Query text as received.
    pub query: String,
    /// Request kind.
    pub query_type: QueryType,
    /// Number of results returned.
    pub num_results: usize,
    /// Whether the request succeeded.
    pub success: bool,
}

impl NewQueryLogEntry {
    /// Creates a successful recommendation entry.
    #[must_use]
    pub fn succeeded(query: impl Into<String>, num_results: usize) -> Self {
        Self {
            query: query.into(),
            query_type: QueryType::Recommendation,
            num_results,
            success: true,
        }
    }

    /// Creates a failed recommendation entry.
    #[must_use]
    pub fn failed(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_type: QueryType::Recommendation,
            num_results: 0,
            success: false,
        }
    }
}

/// A persisted query log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    /// Row id.
    pub id: i64,
    /// Local date, `%Y-%m-%d`.
    pub date: String,
    /// Local time, `%H:%M:%S`.
    pub time: String,
    /// Query text.
    pub query: String,
    /// Stored request kind (raw column value).
    pub query_type: Option<String>,
    /// Number of results returned.
    pub num_results: i64,
    /// Whether the request succeeded.
    pub success: bool,
    /// Insertion timestamp assigned by `SQLite`.
    pub timestamp: String,
}
