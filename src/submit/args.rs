//! Raw submission input, as collected from the command line.
//!
//! Shared fields live in [`SubmitArgs`]; each job type wraps it in its own
//! struct alongside the fields only that type understands.

use arena_model::JobType;

/// Fields common to every job type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitArgs {
    pub name: String,
    pub image: String,
    pub workers: u32,
    pub gpus: u32,
    /// CPU request; empty means not requested.
    pub cpu: String,
    /// Memory request; empty means not requested.
    pub memory: String,
    /// Raw `KEY=VALUE` entries in the order given.
    pub envs: Vec<String>,
    pub sync: SyncArgs,
}

impl Default for SubmitArgs {
    fn default() -> Self {
        Self {
            name: String::new(),
            image: String::new(),
            workers: 1,
            gpus: 0,
            cpu: String::new(),
            memory: String::new(),
            envs: Vec::new(),
            sync: SyncArgs::default(),
        }
    }
}

/// Source-code sync settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncArgs {
    pub mode: Option<String>,
    pub source: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorovodArgs {
    pub base: SubmitArgs,
    /// Requested SSH port, 0 to pick any free one.
    pub ssh_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpiArgs {
    pub base: SubmitArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfArgs {
    pub base: SubmitArgs,
    pub ps_count: u32,
    /// Parameter-server image, defaults to the worker image.
    pub ps_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneArgs {
    pub base: SubmitArgs,
}

/// Submission input for one job of a specific type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobArgs {
    Horovod(HorovodArgs),
    Mpi(MpiArgs),
    Tf(TfArgs),
    Standalone(StandaloneArgs),
}

impl JobArgs {
    pub fn job_type(&self) -> JobType {
        match self {
            JobArgs::Horovod(_) => JobType::HorovodJob,
            JobArgs::Mpi(_) => JobType::MpiJob,
            JobArgs::Tf(_) => JobType::TfJob,
            JobArgs::Standalone(_) => JobType::Standalone,
        }
    }

    pub fn base(&self) -> &SubmitArgs {
        match self {
            JobArgs::Horovod(a) => &a.base,
            JobArgs::Mpi(a) => &a.base,
            JobArgs::Tf(a) => &a.base,
            JobArgs::Standalone(a) => &a.base,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }
}
