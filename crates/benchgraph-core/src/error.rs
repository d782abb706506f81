//! Error types for Benchgraph

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("edge {source_id} -> {target_id} references a node missing from the graph")]
    DanglingEdge { source_id: String, target_id: String },

    #[error("duplicate node in graph file: {0}")]
    DuplicateNode(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaError(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub fn dangling_edge(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::DanglingEdge {
            source_id: source_id.into(),
            target_id: target_id.into(),
        }
    }
}
