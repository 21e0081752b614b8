//! Mock cluster state: jobs, releases, claimed ports and call counts.

use std::collections::{BTreeMap, HashMap, HashSet};

use arena_model::JobType;
use chrono::{DateTime, Utc};

use crate::cluster::DataVolume;
use crate::submit::SubmitParameters;

use super::Operation;

/// Jobs are unique per namespace, name and type.
pub type JobKey = (String, String, JobType);

/// Releases are unique per namespace and name.
pub type ReleaseKey = (String, String);

/// A job created through the workflow client or seeded by a test.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub name: String,
    pub namespace: String,
    pub job_type: JobType,
    /// Parameters handed to `submit_job`; `None` for seeded jobs
    pub params: Option<SubmitParameters>,
    pub created_at: DateTime<Utc>,
}

/// A legacy release.
#[derive(Debug, Clone)]
pub struct ReleaseRecord {
    pub name: String,
    pub namespace: String,
    pub params: Option<SubmitParameters>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub jobs: BTreeMap<JobKey, JobRecord>,
    pub releases: BTreeMap<ReleaseKey, ReleaseRecord>,
    /// Ports already claimed in the cluster
    pub used_ports: HashSet<u16>,
    /// Data volumes by namespace
    pub volumes: BTreeMap<String, Vec<DataVolume>>,
    calls: HashMap<Operation, u32>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&mut self, op: Operation) {
        *self.calls.entry(op).or_insert(0) += 1;
    }

    pub fn calls(&self, op: Operation) -> u32 {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    /// Total calls to operations matching `pred`.
    pub fn calls_where(&self, pred: impl Fn(Operation) -> bool) -> u32 {
        self.calls
            .iter()
            .filter(|(op, _)| pred(**op))
            .map(|(_, count)| count)
            .sum()
    }

    pub fn insert_job(
        &mut self,
        name: &str,
        namespace: &str,
        job_type: JobType,
        params: Option<SubmitParameters>,
    ) {
        let record = JobRecord {
            name: name.to_string(),
            namespace: namespace.to_string(),
            job_type,
            params,
            created_at: Utc::now(),
        };
        self.jobs
            .insert((namespace.to_string(), name.to_string(), job_type), record);
    }

    pub fn has_job(&self, name: &str, namespace: &str, job_type: JobType) -> bool {
        self.jobs
            .contains_key(&(namespace.to_string(), name.to_string(), job_type))
    }

    pub fn remove_job(&mut self, name: &str, namespace: &str, job_type: JobType) -> bool {
        self.jobs
            .remove(&(namespace.to_string(), name.to_string(), job_type))
            .is_some()
    }

    pub fn insert_release(&mut self, name: &str, namespace: &str, params: Option<SubmitParameters>) {
        let record = ReleaseRecord {
            name: name.to_string(),
            namespace: namespace.to_string(),
            params,
            created_at: Utc::now(),
        };
        self.releases
            .insert((namespace.to_string(), name.to_string()), record);
    }

    pub fn has_release(&self, name: &str, namespace: &str) -> bool {
        self.releases
            .contains_key(&(namespace.to_string(), name.to_string()))
    }

    pub fn remove_release(&mut self, name: &str, namespace: &str) -> bool {
        self.releases
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_are_keyed_by_type() {
        let mut state = MockState::new();
        state.insert_job("mnist", "default", JobType::TfJob, None);

        assert!(state.has_job("mnist", "default", JobType::TfJob));
        assert!(!state.has_job("mnist", "default", JobType::MpiJob));
        assert!(!state.has_job("mnist", "other", JobType::TfJob));

        assert!(state.remove_job("mnist", "default", JobType::TfJob));
        assert!(!state.remove_job("mnist", "default", JobType::TfJob));
    }

    #[test]
    fn test_releases_are_keyed_by_namespace() {
        let mut state = MockState::new();
        state.insert_release("legacy", "default", None);
        assert!(state.has_release("legacy", "default"));
        assert!(!state.has_release("legacy", "other"));
        assert!(state.remove_release("legacy", "default"));
        assert!(state.releases.is_empty());
    }

    #[test]
    fn test_call_counts() {
        let mut state = MockState::new();
        assert_eq!(state.calls(Operation::FindJob), 0);
        state.record_call(Operation::FindJob);
        state.record_call(Operation::FindJob);
        assert_eq!(state.calls(Operation::FindJob), 2);
        assert_eq!(state.calls(Operation::DeleteJob), 0);

        state.record_call(Operation::DeleteJob);
        assert_eq!(state.calls_where(Operation::is_mutating), 1);
        assert_eq!(state.calls_where(|_| true), 3);
    }
}
