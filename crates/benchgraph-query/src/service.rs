//! Query service trait

use crate::sparql::{Query, Row};
use std::time::Duration;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query error types
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited")]
    RateLimited,

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl QueryError {
    /// Whether another attempt may succeed. Client errors other than 408/429
    /// mean the query itself is wrong and retrying cannot help.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::NetworkError(e) => !e.is_builder(),
            _ => true,
        }
    }
}

/// A remote graph store that answers structured queries with result rows.
#[async_trait::async_trait]
pub trait QueryService: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query. Implementations must not retry; the executor does.
    async fn select(&self, query: &Query) -> QueryResult<Vec<Row>>;
}
