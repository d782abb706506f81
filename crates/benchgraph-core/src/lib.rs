//! Benchgraph Core - graph and task types, schema index, persistence

pub mod error;
pub mod rng;
pub mod schema;
pub mod store;
pub mod types;
pub mod usage;

pub use error::{Error, Result};
pub use rng::SeededRng;
pub use schema::{parse_relation, Direction, EntityType, SchemaAction, SchemaIndex};
pub use types::*;
pub use usage::UsageCounter;
