//! Submission guard
//!
//! Refuses to create a job when one with the same name already exists in the
//! namespace. The check and the subsequent creation are separate cluster
//! calls, so two concurrent submissions of the same name can both pass; the
//! creation call itself is the only place a duplicate can still be caught.

use arena_model::JobType;

use crate::context::ArenaContext;
use crate::error::ArenaError;

pub struct SubmissionGuard<'a> {
    ctx: &'a ArenaContext,
}

impl<'a> SubmissionGuard<'a> {
    pub fn new(ctx: &'a ArenaContext) -> Self {
        Self { ctx }
    }

    /// Fail with [`ArenaError::AlreadyExists`] if a job of this type and name exists.
    pub fn ensure_not_exists(&self, job_type: JobType, name: &str) -> Result<(), ArenaError> {
        let found = self
            .ctx
            .workflow
            .find_job(name, &self.ctx.namespace, job_type)
            .map_err(|e| ArenaError::collaborator("check existing job", name, e))?;

        if found {
            tracing::debug!(job = name, job_type = %job_type, "job already exists");
            return Err(ArenaError::AlreadyExists {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Fail with [`ArenaError::AlreadyExists`] if a legacy release with this name exists.
    pub fn ensure_release_absent(&self, name: &str) -> Result<(), ArenaError> {
        let exists = self
            .ctx
            .releases
            .check_release(name)
            .map_err(|e| ArenaError::collaborator("check existing release", name, e))?;

        if exists {
            tracing::debug!(job = name, "release already exists");
            return Err(ArenaError::AlreadyExists {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
