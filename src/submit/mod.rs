//! Job submission
//!
//! A submission is: build validated parameters, check that no job with the
//! same name exists, then hand the parameters to the workflow client (or the
//! legacy release installer). Nothing mutating is called until both the
//! parameters and the guard have passed.

mod args;
mod guard;
mod params;

pub use args::{HorovodArgs, JobArgs, MpiArgs, StandaloneArgs, SubmitArgs, SyncArgs, TfArgs};
pub use guard::SubmissionGuard;
pub use params::{
    prepare, BaseParameters, SubmitParameters, SyncMode, SyncSource, TypeExtension, MAX_NAME_LEN,
};

use crate::context::ArenaContext;
use crate::error::ArenaError;

/// Where a submitted job is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitBackend {
    /// Type-aware workflow resources.
    #[default]
    Workflow,
    /// Legacy package release, identified by name only.
    Release,
}

pub struct Submitter<'a> {
    ctx: &'a ArenaContext,
}

impl<'a> Submitter<'a> {
    pub fn new(ctx: &'a ArenaContext) -> Self {
        Self { ctx }
    }

    /// Submit one job and return the parameters that were handed off.
    pub fn submit(
        &self,
        args: &JobArgs,
        command: &[String],
        backend: SubmitBackend,
    ) -> Result<SubmitParameters, ArenaError> {
        let params = prepare(args, command, self.ctx)?;
        let name = params.name().to_string();
        let job_type = params.job_type();
        let chart = self.ctx.chart_path(job_type);
        let guard = SubmissionGuard::new(self.ctx);

        match backend {
            SubmitBackend::Workflow => {
                guard.ensure_not_exists(job_type, &name)?;
                self.ctx
                    .workflow
                    .submit_job(&name, job_type, &self.ctx.namespace, &params, &chart)
                    .map_err(|e| ArenaError::collaborator("submit job", &name, e))?;

                tracing::info!("The Job {} has been submitted successfully", name);
                tracing::info!("You can find it with `arena list | grep {}`", name);
                Ok(params)
            }
            SubmitBackend::Release => {
                guard.ensure_release_absent(&name)?;
                let installed = params.for_release_install();
                self.ctx
                    .releases
                    .install_release(&name, &self.ctx.namespace, &installed, &chart)
                    .map_err(|e| ArenaError::collaborator("install release", &name, e))?;

                tracing::info!("The Job {} has been submitted successfully", name);
                Ok(installed)
            }
        }
    }
}
