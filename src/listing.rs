//! Job and data volume listings
//!
//! Backs `arena list` and `arena data list`. Rendering is kept apart from the
//! queries so tables can be checked without a cluster.

use std::fmt::Write;

use chrono::{DateTime, Duration, Utc};

use crate::cluster::{DataVolume, JobSummary};
use crate::context::ArenaContext;
use crate::error::ArenaError;

/// Jobs arena created in the context's namespace.
pub fn list_jobs(ctx: &ArenaContext) -> Result<Vec<JobSummary>, ArenaError> {
    let jobs = ctx
        .workflow
        .list_jobs(&ctx.namespace)
        .map_err(|e| ArenaError::collaborator("list jobs in", &ctx.namespace, e))?;
    tracing::debug!(namespace = %ctx.namespace, count = jobs.len(), "listed jobs");
    Ok(jobs)
}

/// Data volumes in the context's namespace.
pub fn list_volumes(ctx: &ArenaContext) -> Result<Vec<DataVolume>, ArenaError> {
    ctx.volumes
        .list_volumes(&ctx.namespace)
        .map_err(|e| ArenaError::collaborator("list data volumes in", &ctx.namespace, e))
}

pub fn render_jobs(jobs: &[JobSummary]) -> String {
    let rows = jobs
        .iter()
        .map(|job| vec![job.name.clone(), job.job_type.to_string()])
        .collect::<Vec<_>>();
    render_table(&["NAME", "TYPE"], &rows)
}

pub fn render_volumes(volumes: &[DataVolume], now: DateTime<Utc>) -> String {
    let rows = volumes
        .iter()
        .map(|v| {
            vec![
                v.name.clone(),
                v.access_modes.join(","),
                v.description.clone(),
                v.owner.clone(),
                v.created_at
                    .map(|created| short_age(now - created))
                    .unwrap_or_else(|| "<unknown>".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&["NAME", "ACCESSMODE", "DESCRIPTION", "OWNER", "AGE"], &rows)
}

/// Compact age such as `45s`, `12m`, `5h` or `3d`.
fn short_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 120 => format!("{}s", s),
        s if s < 2 * 3600 => format!("{}m", s / 60),
        s if s < 48 * 3600 => format!("{}h", s / 3600),
        s if s < 365 * 86400 => format!("{}d", s / 86400),
        s => format!("{}y", s / (365 * 86400)),
    }
}

/// Left-aligned columns separated by two spaces, header first.
fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(&header).chain(rows) {
        let mut line = String::new();
        for (cell, width) in row.iter().zip(&widths) {
            let _ = write!(line, "{:<width$}  ", cell, width = width);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
