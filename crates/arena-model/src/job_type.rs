//! Job type registry.
//!
//! Every training job in the cluster carries exactly one of these types.
//! Raw strings are converted once, at the CLI boundary, through [`FromStr`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Classification of a distributed training job by its parallelism pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobType {
    /// Single-process job with no coordination.
    #[serde(rename = "standalonejob")]
    Standalone,
    /// Parameter-server style TensorFlow job.
    #[serde(rename = "tfjob")]
    TfJob,
    /// MPI launcher plus workers.
    #[serde(rename = "mpijob")]
    MpiJob,
    /// Ring-allreduce job coordinated over SSH.
    #[serde(rename = "horovodjob")]
    HorovodJob,
}

impl JobType {
    /// All known job types, in registry order.
    pub const ALL: [JobType; 4] = [
        JobType::Standalone,
        JobType::TfJob,
        JobType::MpiJob,
        JobType::HorovodJob,
    ];

    /// The identifier used on the command line and in cluster metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Standalone => "standalonejob",
            JobType::TfJob => "tfjob",
            JobType::MpiJob => "mpijob",
            JobType::HorovodJob => "horovodjob",
        }
    }

    /// Whether the first replica also counts as a worker.
    pub fn master_is_worker(&self) -> bool {
        matches!(self, JobType::HorovodJob)
    }

    /// Whether submission needs an ephemeral port allocated up front.
    pub fn needs_ephemeral_port(&self) -> bool {
        matches!(self, JobType::HorovodJob)
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::UnknownJobType(s.to_string()))
    }
}

/// Returns true if `candidate` names a known job type.
pub fn is_known_type(candidate: &str) -> bool {
    JobType::ALL.iter().any(|t| t.as_str() == candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_are_recognized() {
        for t in ["standalonejob", "tfjob", "mpijob", "horovodjob"] {
            assert!(is_known_type(t), "{t} should be known");
        }
    }

    #[test]
    fn lookup_is_exact() {
        assert!(!is_known_type(""));
        assert!(!is_known_type("TFJob"));
        assert!(!is_known_type("horovod"));
        assert!(!is_known_type(" mpijob"));
    }

    #[test]
    fn parse_matches_display() {
        for t in JobType::ALL {
            assert_eq!(t.to_string().parse::<JobType>().unwrap(), t);
        }
    }

    #[test]
    fn parse_unknown_is_error() {
        let err = "pytorchjob".parse::<JobType>().unwrap_err();
        assert_eq!(err, ModelError::UnknownJobType("pytorchjob".to_string()));
        assert!(err.to_string().contains("pytorchjob"));
    }

    #[test]
    fn serde_uses_wire_identifier() {
        let json = serde_json::to_string(&JobType::HorovodJob).unwrap();
        assert_eq!(json, "\"horovodjob\"");
        let back: JobType = serde_json::from_str("\"tfjob\"").unwrap();
        assert_eq!(back, JobType::TfJob);
    }

    #[test]
    fn master_counts_as_worker_for_horovod_only() {
        assert!(JobType::HorovodJob.master_is_worker());
        assert!(!JobType::MpiJob.master_is_worker());
        assert!(!JobType::TfJob.master_is_worker());
        assert!(!JobType::Standalone.master_is_worker());
    }
}
