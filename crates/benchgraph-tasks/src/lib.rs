//! Benchgraph Tasks - path sampling and constraint validation

pub mod context;
pub mod sampler;
pub mod validator;

pub use context::{build_context, is_person_like, is_strong, normalize_value, StepKind};
pub use sampler::{edge_score, start_weights, PathSampler, SampleConfig, SampleRun, StartBias};
pub use validator::{ConstraintValidator, Validation, ValidatorConfig};
