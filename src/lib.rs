//! benchgraph - schema-driven knowledge-graph crawler and multi-hop task builder

pub mod config;
pub mod pipeline;
pub mod registry;

pub use config::BuilderConfig;
pub use pipeline::{BuildSummary, GraphStats, Pipeline};
pub use registry::{load_schema, load_schema_document};
