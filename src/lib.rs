//! Arena - submit and delete distributed training jobs on Kubernetes
//!
//! A job is submitted as one of a fixed set of job types. Submission builds
//! validated parameters, refuses names that are already taken, then hands
//! off to the workflow client (or the legacy release installer). Deletion
//! works out which job type a bare name refers to and never guesses when
//! the answer is ambiguous. Jobs and data volumes in a namespace can be
//! listed.

pub mod cluster;
pub mod config;
pub mod context;
pub mod delete;
pub mod error;
pub mod listing;
pub mod logging;
pub mod mock;
pub mod resolver;
pub mod submit;

pub use arena_model::{is_known_type, Env, JobType, Quantity};
pub use config::{ArenaConfig, ConfigError};
pub use context::ArenaContext;
pub use delete::{DeletedVia, DeletionOrchestrator, DeletionReport, DeletionState};
pub use error::ArenaError;
pub use logging::{init_logger, LoggerConfig, LoggerError, LoggerFormat, LoggerLevel};
pub use resolver::{ResolutionResult, TypeResolver};
pub use submit::{JobArgs, SubmitBackend, SubmitParameters, Submitter};
