//! Job type resolution
//!
//! Given a job name without a type, find every job type that has a job of
//! that name in the namespace. More than one match is never narrowed down
//! by guessing: acting on the wrong job type cannot be undone.

use std::collections::BTreeSet;

use arena_model::JobType;

use crate::context::ArenaContext;
use crate::error::ArenaError;

/// Classification of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    NotFound,
    UniqueMatch(JobType),
    Ambiguous(BTreeSet<JobType>),
}

impl ResolutionResult {
    pub fn from_types(mut types: BTreeSet<JobType>) -> Self {
        match types.len() {
            0 => ResolutionResult::NotFound,
            1 => match types.pop_first() {
                Some(t) => ResolutionResult::UniqueMatch(t),
                None => ResolutionResult::NotFound,
            },
            _ => ResolutionResult::Ambiguous(types),
        }
    }

    /// The single matching type, or the error to report for `name`.
    pub fn into_job_type(self, name: &str) -> Result<JobType, ArenaError> {
        match self {
            ResolutionResult::UniqueMatch(t) => Ok(t),
            ResolutionResult::NotFound => Err(ArenaError::NotFound {
                name: name.to_string(),
            }),
            ResolutionResult::Ambiguous(candidates) => Err(ArenaError::AmbiguousType {
                name: name.to_string(),
                candidates,
            }),
        }
    }
}

pub struct TypeResolver<'a> {
    ctx: &'a ArenaContext,
}

impl<'a> TypeResolver<'a> {
    pub fn new(ctx: &'a ArenaContext) -> Self {
        Self { ctx }
    }

    /// Every job type with a job named `name` in the namespace.
    ///
    /// Queries once per known type. A failed query fails the whole
    /// resolution rather than returning a partial set.
    pub fn resolve_types(&self, name: &str) -> Result<BTreeSet<JobType>, ArenaError> {
        let mut found = BTreeSet::new();
        for job_type in JobType::ALL {
            let exists = self
                .ctx
                .workflow
                .find_job(name, &self.ctx.namespace, job_type)
                .map_err(|e| ArenaError::collaborator("look up job type of", name, e))?;
            if exists {
                found.insert(job_type);
            }
        }
        tracing::debug!(job = name, matches = ?found, "resolved job types");
        Ok(found)
    }

    pub fn resolve(&self, name: &str) -> Result<ResolutionResult, ArenaError> {
        self.resolve_types(name).map(ResolutionResult::from_types)
    }
}
