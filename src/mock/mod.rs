//! In-memory cluster for tests
//!
//! [`MockCluster`] implements every cluster collaborator trait over shared
//! state, so clones handed to an [`crate::context::ArenaContext`] and the
//! handle kept by the test observe the same jobs, releases and call counts.
//! Any operation can be made to fail through [`MockCluster::inject_failure`].

mod cluster;
mod failure;
mod state;

pub use cluster::MockCluster;
pub use failure::{FailureConfig, FailureInjector};
pub use state::{JobRecord, MockState, ReleaseRecord};

/// Collaborator operations the mock records and can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    SubmitJob,
    DeleteJob,
    FindJob,
    InstallRelease,
    DeleteRelease,
    CheckRelease,
    SelectPort,
    ListJobs,
    ListVolumes,
}

impl Operation {
    /// Operations that change cluster state.
    pub const MUTATING: [Operation; 4] = [
        Operation::SubmitJob,
        Operation::DeleteJob,
        Operation::InstallRelease,
        Operation::DeleteRelease,
    ];

    pub fn is_mutating(self) -> bool {
        Self::MUTATING.contains(&self)
    }
}
