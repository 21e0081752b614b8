//! Arena Model Types
//!
//! Shared data model for training-job submission: the closed job-type
//! registry, Kubernetes resource quantities and the job environment map.

pub mod env;
pub mod error;
pub mod job_type;
pub mod quantity;

pub use env::Env;
pub use error::{ModelError, ModelResult};
pub use job_type::{is_known_type, JobType};
pub use quantity::Quantity;

/// Delimiter between key and value in `--env` arguments.
pub const ENV_DELIMITER: char = '=';
