//! Benchgraph Query - remote knowledge-base access with bounded retries

pub mod endpoint;
pub mod executor;
pub mod mock;
pub mod service;
pub mod sparql;

pub use endpoint::SparqlEndpoint;
pub use executor::{Fetched, QueryExecutor, RetryPolicy};
pub use service::{QueryError, QueryResult, QueryService};
pub use sparql::{AttributeQuery, NeighborQuery, Query, Row};
