//! Retrying query executor.
//!
//! Crawl progress is favoured over strict error surfacing: once retries are
//! exhausted the caller sees an empty result. The reason is kept in
//! [`Fetched`] so callers that care (crawl reports, re-runs) can tell an
//! unreachable service apart from a legitimately empty answer.

use crate::service::QueryService;
use crate::sparql::{Query, Row};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait after the `attempt`-th failure (1-based): base × 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Outcome of an executed query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetched {
    Rows(Vec<Row>),
    /// Every attempt failed with a transient error.
    Unreachable { attempts: u32, last_error: String },
    /// The service refused the query itself; retrying cannot help.
    Rejected { error: String },
}

impl Fetched {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Rows(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Rows, or empty when the query failed.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct QueryExecutor {
    service: Arc<dyn QueryService>,
    policy: RetryPolicy,
}

impl QueryExecutor {
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self {
            service,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn execute(&self, query: &Query) -> Fetched {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.service.select(query).await {
                Ok(rows) => return Fetched::Rows(rows),
                Err(e) if !e.is_transient() => {
                    warn!(entity = query.entity(), service = self.service.name(), "query rejected: {e}");
                    return Fetched::Rejected {
                        error: e.to_string(),
                    };
                }
                Err(e) if attempt < max_attempts => {
                    let backoff = self.policy.delay_for(attempt);
                    warn!(
                        entity = query.entity(),
                        "query failed: {e}; retrying in {backoff:?} (attempt {attempt}/{max_attempts})"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!(
                        entity = query.entity(),
                        "query failed after {max_attempts} attempts: {e}"
                    );
                    return Fetched::Unreachable {
                        attempts: attempt,
                        last_error: e.to_string(),
                    };
                }
            }
        }
    }
}
