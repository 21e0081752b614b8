//! Job deletion
//!
//! Deleting one name walks a small state machine:
//!
//! ```text
//! AttemptLegacy --ok--> Deleted(Release)
//!       |
//!      err (swallowed)
//!       v
//! ResolveType --not found / ambiguous--> Failed
//!       |
//!     unique
//!       v
//! DeleteTyped(t) --ok--> Deleted(Workflow(t))
//!                --err-> Failed
//! ```
//!
//! A caller-supplied type starts the machine at `DeleteTyped`, skipping both
//! the legacy attempt and resolution. Names in a batch are independent: a
//! failure is logged and the next name proceeds.

use std::fmt;

use arena_model::JobType;

use crate::context::ArenaContext;
use crate::error::ArenaError;
use crate::resolver::TypeResolver;

/// How a job was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedVia {
    Release,
    Workflow(JobType),
}

impl fmt::Display for DeletedVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletedVia::Release => f.write_str("release"),
            DeletedVia::Workflow(t) => write!(f, "{}", t),
        }
    }
}

#[derive(Debug)]
pub enum DeletionState {
    AttemptLegacy,
    ResolveType,
    DeleteTyped(JobType),
    Deleted(DeletedVia),
    Failed(ArenaError),
}

impl DeletionState {
    /// Starting state, given the type the caller named (if any).
    pub fn initial(explicit: Option<JobType>) -> Self {
        match explicit {
            Some(t) => DeletionState::DeleteTyped(t),
            None => DeletionState::AttemptLegacy,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeletionState::Deleted(_) | DeletionState::Failed(_))
    }
}

/// Result of deleting one name.
#[derive(Debug)]
pub struct DeletionOutcome {
    pub name: String,
    pub result: Result<DeletedVia, ArenaError>,
}

/// Results of a batch, in input order.
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub outcomes: Vec<DeletionOutcome>,
}

impl DeletionReport {
    pub fn deleted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.deleted_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ArenaError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }
}

pub struct DeletionOrchestrator<'a> {
    ctx: &'a ArenaContext,
}

impl<'a> DeletionOrchestrator<'a> {
    pub fn new(ctx: &'a ArenaContext) -> Self {
        Self { ctx }
    }

    /// Advance `name` by one transition. Terminal states are returned unchanged.
    pub fn step(&self, name: &str, state: DeletionState) -> DeletionState {
        match state {
            DeletionState::AttemptLegacy => match self.ctx.releases.delete_release(name) {
                Ok(()) => DeletionState::Deleted(DeletedVia::Release),
                Err(e) => {
                    tracing::debug!("{} wasn't deleted as a release due to {}", name, e);
                    DeletionState::ResolveType
                }
            },
            DeletionState::ResolveType => {
                let resolved = TypeResolver::new(self.ctx)
                    .resolve(name)
                    .and_then(|r| r.into_job_type(name));
                match resolved {
                    Ok(t) => DeletionState::DeleteTyped(t),
                    Err(e) => DeletionState::Failed(e),
                }
            }
            DeletionState::DeleteTyped(t) => {
                match self.ctx.workflow.delete_job(name, &self.ctx.namespace, t) {
                    Ok(()) => DeletionState::Deleted(DeletedVia::Workflow(t)),
                    Err(e) => DeletionState::Failed(ArenaError::collaborator("delete job", name, e)),
                }
            }
            terminal => terminal,
        }
    }

    /// Run one name to a terminal state.
    pub fn delete(&self, name: &str, explicit: Option<JobType>) -> Result<DeletedVia, ArenaError> {
        let mut state = DeletionState::initial(explicit);
        loop {
            state = match state {
                DeletionState::Deleted(via) => {
                    match via {
                        DeletedVia::Release => {
                            tracing::info!("Delete the job {} successfully.", name)
                        }
                        DeletedVia::Workflow(_) => {
                            tracing::info!("The Job {} has been deleted successfully", name)
                        }
                    }
                    return Ok(via);
                }
                DeletionState::Failed(e) => return Err(e),
                pending => self.step(name, pending),
            };
        }
    }

    /// Delete every name in order. One name's failure does not stop the rest.
    pub fn delete_all<S: AsRef<str>>(&self, names: &[S], explicit: Option<JobType>) -> DeletionReport {
        let mut report = DeletionReport::default();
        for name in names {
            let name = name.as_ref();
            let result = self.delete(name, explicit);
            if let Err(e) = &result {
                tracing::error!("Failed to delete {}, the reason is that {}", name, e);
            }
            report.outcomes.push(DeletionOutcome {
                name: name.to_string(),
                result,
            });
        }
        report
    }
}
