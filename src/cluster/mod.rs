//! Cluster collaborators
//!
//! The core only talks to the cluster through these traits:
//! - [`WorkflowClient`]: type-aware job resources
//! - [`ReleaseInstaller`]: legacy package releases, identified by name only
//! - [`PortAllocator`]: ephemeral port selection for SSH-coordinated jobs
//! - [`VolumeLister`]: data volumes available to jobs
//!
//! Production implementations shell out to `kubectl` and `helm`; tests use
//! [`crate::mock::MockCluster`].

mod helm;
mod kubectl;
mod ports;
mod volumes;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use arena_model::JobType;
use uuid::Uuid;

use crate::submit::SubmitParameters;

pub use helm::HelmInstaller;
pub use kubectl::{Kubectl, KubectlWorkflow, ARENA_CREATED_BY_LABEL};
pub use ports::{select_port, ClusterPortAllocator, PortAllocationError, PortRange};
pub use volumes::DataVolume;

/// A job as recorded in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct JobSummary {
    pub name: String,
    pub job_type: JobType,
}

/// Type-aware job operations against the cluster.
pub trait WorkflowClient: Send + Sync {
    /// Create the resources for a job from its chart and parameters.
    fn submit_job(
        &self,
        name: &str,
        job_type: JobType,
        namespace: &str,
        params: &SubmitParameters,
        chart: &Path,
    ) -> Result<(), ClusterError>;

    /// Remove every resource belonging to the job.
    fn delete_job(&self, name: &str, namespace: &str, job_type: JobType) -> Result<(), ClusterError>;

    /// Whether a job of this type and name exists in the namespace.
    fn find_job(&self, name: &str, namespace: &str, job_type: JobType) -> Result<bool, ClusterError>;

    /// Every job arena created in the namespace, sorted by name.
    fn list_jobs(&self, namespace: &str) -> Result<Vec<JobSummary>, ClusterError>;
}

/// Legacy release operations.
pub trait ReleaseInstaller: Send + Sync {
    fn install_release(
        &self,
        name: &str,
        namespace: &str,
        params: &SubmitParameters,
        chart: &Path,
    ) -> Result<(), ClusterError>;

    fn delete_release(&self, name: &str) -> Result<(), ClusterError>;

    fn check_release(&self, name: &str) -> Result<bool, ClusterError>;
}

/// Ephemeral port selection.
pub trait PortAllocator: Send + Sync {
    /// Return `preferred` if it is free, or any free port when `preferred` is 0.
    fn select_available_port(&self, preferred: u16) -> Result<u16, PortAllocationError>;
}

pub trait VolumeLister: Send + Sync {
    fn list_volumes(&self, namespace: &str) -> Result<Vec<DataVolume>, ClusterError>;
}

/// Errors surfaced by cluster collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from {program}: {detail}")]
    UnexpectedOutput { program: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Run a command to completion and return its stdout.
///
/// Non-zero exits become [`ClusterError::CommandFailed`] carrying trimmed stderr.
pub(crate) fn run_command(mut command: Command) -> Result<String, ClusterError> {
    let program = command.get_program().to_string_lossy().to_string();
    tracing::debug!(command = ?command, "running");

    let output = command.output().map_err(|source| ClusterError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(ClusterError::CommandFailed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Temporary file removed when dropped.
///
/// Used for values documents and rendered manifests handed to `helm`/`kubectl`.
pub(crate) struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub(crate) fn write(extension: &str, contents: &[u8]) -> Result<Self, ClusterError> {
        let path = std::env::temp_dir().join(format!("arena-{}.{}", Uuid::new_v4(), extension));
        fs::write(&path, contents)?;
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to remove scratch file");
        }
    }
}

/// Serialize parameters into a values file for chart rendering.
pub(crate) fn write_values(params: &SubmitParameters) -> Result<ScratchFile, ClusterError> {
    let values = serde_json::to_vec_pretty(&params.to_values()?)?;
    ScratchFile::write("json", &values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_file_is_removed_on_drop() {
        let file = ScratchFile::write("json", b"{}").unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("arena-"));
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn run_command_reports_spawn_failure() {
        let err = run_command(Command::new("arena-definitely-not-a-binary")).unwrap_err();
        assert!(matches!(err, ClusterError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn run_command_captures_stdout_and_failures() {
        let mut ok = Command::new("sh");
        ok.args(["-c", "echo hello"]);
        assert_eq!(run_command(ok).unwrap().trim(), "hello");

        let mut bad = Command::new("sh");
        bad.args(["-c", "echo boom >&2; exit 3"]);
        match run_command(bad).unwrap_err() {
            ClusterError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
