//! HTTP SPARQL endpoint (Wikidata Query Service by default)

use crate::service::{QueryError, QueryResult, QueryService};
use crate::sparql::{parse_results, Query, Row};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

pub const WIKIDATA_SPARQL_URL: &str = "https://query.wikidata.org/sparql";

pub struct SparqlEndpoint {
    client: Client,
    url: String,
    timeout: Duration,
}

impl SparqlEndpoint {
    /// `user_agent` identifies this client to the service operator; public
    /// endpoints throttle or block anonymous agents.
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> QueryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl QueryService for SparqlEndpoint {
    fn name(&self) -> &str {
        "sparql"
    }

    async fn select(&self, query: &Query) -> QueryResult<Vec<Row>> {
        let sparql = query.to_sparql();
        debug!(entity = query.entity(), "sparql request");

        let response = self
            .client
            .get(&self.url)
            .query(&[("query", sparql.as_str()), ("format", "json")])
            .header("accept", "application/sparql-results+json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QueryError::Timeout(self.timeout)
                } else {
                    QueryError::NetworkError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("SPARQL endpoint error {}: {}", status, truncate(&body, 200));
            if status.as_u16() == 429 {
                return Err(QueryError::RateLimited);
            }
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_results(&body).map_err(|e| QueryError::InvalidResponse(e.to_string()))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
