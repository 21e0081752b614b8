//! Mock collaborator implementations.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use arena_model::JobType;

use chrono::Utc;

use crate::cluster::{
    select_port, ClusterError, DataVolume, JobSummary, PortAllocationError, PortAllocator,
    PortRange, ReleaseInstaller, VolumeLister, WorkflowClient,
};
use crate::submit::SubmitParameters;

use super::failure::{FailureConfig, FailureInjector};
use super::state::{JobRecord, MockState, ReleaseRecord};
use super::Operation;

/// Shared-state mock of the workflow client, release installer and port
/// allocator.
#[derive(Debug, Clone)]
pub struct MockCluster {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
    port_range: PortRange,
    /// Namespace release operations act in; releases are not namespaced in
    /// the trait, the installer is bound to one.
    release_namespace: String,
}

impl Default for MockCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCluster {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new())),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
            port_range: PortRange::default(),
            release_namespace: "default".to_string(),
        }
    }

    /// A handle sharing this cluster's state whose release operations act in `namespace`.
    pub fn scoped(&self, namespace: &str) -> Self {
        Self {
            release_namespace: namespace.to_string(),
            ..self.clone()
        }
    }

    pub fn with_port_range(mut self, range: PortRange) -> Self {
        self.port_range = range;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call, then apply any injected failure.
    fn enter(&self, op: Operation) -> Result<(), ClusterError> {
        self.state().record_call(op);
        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .check(op);
        match failure {
            Some(message) => Err(ClusterError::Rejected(message)),
            None => Ok(()),
        }
    }

    // === Test setup ===

    pub fn add_job(&self, name: &str, namespace: &str, job_type: JobType) {
        self.state().insert_job(name, namespace, job_type, None);
    }

    pub fn add_release(&self, name: &str, namespace: &str) {
        self.state().insert_release(name, namespace, None);
    }

    pub fn add_volume(&self, namespace: &str, name: &str, owner: &str) {
        self.state()
            .volumes
            .entry(namespace.to_string())
            .or_default()
            .push(DataVolume {
                name: name.to_string(),
                access_modes: vec!["ReadWriteMany".to_string()],
                description: String::new(),
                owner: owner.to_string(),
                created_at: Some(Utc::now()),
            });
    }

    pub fn mark_port_used(&self, port: u16) {
        self.state().used_ports.insert(port);
    }

    pub fn inject_failure(&self, op: Operation, message: impl Into<String>) {
        self.inject(op, FailureConfig::error(message));
    }

    pub fn inject(&self, op: Operation, config: FailureConfig) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .inject(op, config);
    }

    // === Inspection ===

    pub fn has_job(&self, name: &str, namespace: &str, job_type: JobType) -> bool {
        self.state().has_job(name, namespace, job_type)
    }

    pub fn has_release(&self, name: &str, namespace: &str) -> bool {
        self.state().has_release(name, namespace)
    }

    pub fn job_count(&self) -> usize {
        self.state().jobs.len()
    }

    pub fn calls(&self, op: Operation) -> u32 {
        self.state().calls(op)
    }

    /// Total calls to operations that change cluster state.
    pub fn mutating_calls(&self) -> u32 {
        self.state().calls_where(Operation::is_mutating)
    }

    /// Parameters of a job created through `submit_job`.
    pub fn submitted_params(&self, name: &str, namespace: &str, job_type: JobType) -> Option<SubmitParameters> {
        self.state()
            .jobs
            .values()
            .find(|j: &&JobRecord| j.name == name && j.namespace == namespace && j.job_type == job_type)
            .and_then(|j| j.params.clone())
    }

    /// Parameters of a release created through `install_release`.
    pub fn installed_params(&self, name: &str, namespace: &str) -> Option<SubmitParameters> {
        self.state()
            .releases
            .values()
            .find(|r: &&ReleaseRecord| r.name == name && r.namespace == namespace)
            .and_then(|r| r.params.clone())
    }
}

impl WorkflowClient for MockCluster {
    fn submit_job(
        &self,
        name: &str,
        job_type: JobType,
        namespace: &str,
        params: &SubmitParameters,
        _chart: &Path,
    ) -> Result<(), ClusterError> {
        self.enter(Operation::SubmitJob)?;
        let mut state = self.state();
        if state.has_job(name, namespace, job_type) {
            return Err(ClusterError::Rejected(format!(
                "{}-{} already exists",
                name, job_type
            )));
        }
        state.insert_job(name, namespace, job_type, Some(params.clone()));
        Ok(())
    }

    fn delete_job(&self, name: &str, namespace: &str, job_type: JobType) -> Result<(), ClusterError> {
        self.enter(Operation::DeleteJob)?;
        if self.state().remove_job(name, namespace, job_type) {
            Ok(())
        } else {
            Err(ClusterError::Rejected(format!(
                "{}-{} not found",
                name, job_type
            )))
        }
    }

    fn find_job(&self, name: &str, namespace: &str, job_type: JobType) -> Result<bool, ClusterError> {
        self.enter(Operation::FindJob)?;
        Ok(self.state().has_job(name, namespace, job_type))
    }

    fn list_jobs(&self, namespace: &str) -> Result<Vec<JobSummary>, ClusterError> {
        self.enter(Operation::ListJobs)?;
        let mut jobs: Vec<JobSummary> = self
            .state()
            .jobs
            .values()
            .filter(|j| j.namespace == namespace)
            .map(|j| JobSummary {
                name: j.name.clone(),
                job_type: j.job_type,
            })
            .collect();
        jobs.sort();
        Ok(jobs)
    }
}

impl VolumeLister for MockCluster {
    fn list_volumes(&self, namespace: &str) -> Result<Vec<DataVolume>, ClusterError> {
        self.enter(Operation::ListVolumes)?;
        let mut volumes = self.state().volumes.get(namespace).cloned().unwrap_or_default();
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }
}

impl ReleaseInstaller for MockCluster {
    fn install_release(
        &self,
        name: &str,
        namespace: &str,
        params: &SubmitParameters,
        _chart: &Path,
    ) -> Result<(), ClusterError> {
        self.enter(Operation::InstallRelease)?;
        let mut state = self.state();
        if state.has_release(name, namespace) {
            return Err(ClusterError::Rejected(format!(
                "cannot re-use a name that is still in use: {}",
                name
            )));
        }
        state.insert_release(name, namespace, Some(params.clone()));
        Ok(())
    }

    fn delete_release(&self, name: &str) -> Result<(), ClusterError> {
        self.enter(Operation::DeleteRelease)?;
        if self.state().remove_release(name, &self.release_namespace) {
            Ok(())
        } else {
            Err(ClusterError::Rejected(format!(
                "release: \"{}\" not found",
                name
            )))
        }
    }

    fn check_release(&self, name: &str) -> Result<bool, ClusterError> {
        self.enter(Operation::CheckRelease)?;
        Ok(self.state().has_release(name, &self.release_namespace))
    }
}

impl PortAllocator for MockCluster {
    fn select_available_port(&self, preferred: u16) -> Result<u16, PortAllocationError> {
        self.enter(Operation::SelectPort)?;
        let used = self.state().used_ports.clone();
        select_port(&used, self.port_range, preferred, &mut rand::thread_rng())
    }
}
