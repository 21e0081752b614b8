//! Error types for the arena model.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown training type '{0}', the possible option is standalonejob, tfjob, mpijob or horovodjob")]
    UnknownJobType(String),

    #[error("invalid quantity '{value}' for {field}")]
    InvalidQuantity { field: String, value: String },

    #[error("invalid environment entry '{0}', expected KEY=VALUE")]
    InvalidEnv(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
