//! Error taxonomy for submission and deletion.
//!
//! Every variant renders as a single human-readable line that names the job
//! involved and, where one exists, the remedy.

use std::collections::BTreeSet;

use arena_model::{JobType, ModelError};

use crate::cluster::{ClusterError, PortAllocationError};
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to select ssh port: {0}")]
    PortAllocation(#[from] PortAllocationError),

    #[error("the job {name} already exists, please delete it first via 'arena delete {name}'")]
    AlreadyExists { name: String },

    #[error("There is no training job found with the name {name}, please check it with `arena list | grep {name}`")]
    NotFound { name: String },

    #[error(
        "There are more than 1 training jobs with the same name {name} ({}), please double check with `arena list | grep {name}`. And use `arena delete {name} --type` to delete the exact one.",
        join_types(.candidates)
    )]
    AmbiguousType {
        name: String,
        candidates: BTreeSet<JobType>,
    },

    #[error("failed to {operation} {name}: {source}")]
    Collaborator {
        operation: &'static str,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error("failed to resolve namespace: {0}")]
    Namespace(#[source] ClusterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ArenaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap a collaborator failure with the operation and job it concerned.
    pub fn collaborator(operation: &'static str, name: &str, source: ClusterError) -> Self {
        Self::Collaborator {
            operation,
            name: name.to_string(),
            source,
        }
    }
}

impl From<ModelError> for ArenaError {
    fn from(err: ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}

fn join_types(types: &BTreeSet<JobType>) -> String {
    types
        .iter()
        .map(JobType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_lists_every_candidate() {
        let err = ArenaError::AmbiguousType {
            name: "mnist".to_string(),
            candidates: [JobType::MpiJob, JobType::TfJob].into_iter().collect(),
        };
        let msg = err.to_string();
        assert!(msg.contains("mnist"));
        assert!(msg.contains("tfjob, mpijob"));
        assert!(msg.contains("--type"));
    }

    #[test]
    fn not_found_suggests_listing() {
        let msg = ArenaError::NotFound { name: "ghost".to_string() }.to_string();
        assert!(msg.contains("ghost"));
        assert!(msg.contains("arena list | grep ghost"));
    }

    #[test]
    fn model_errors_become_validation() {
        let err: ArenaError = ModelError::InvalidEnv("X".to_string()).into();
        assert!(matches!(err, ArenaError::Validation(_)));
    }

    #[test]
    fn collaborator_error_names_operation_and_job() {
        let err = ArenaError::collaborator(
            "delete job",
            "mnist",
            ClusterError::Rejected("forbidden".to_string()),
        );
        assert_eq!(err.to_string(), "failed to delete job mnist: forbidden");
    }
}
