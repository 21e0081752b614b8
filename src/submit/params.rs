//! Submission parameter builder
//!
//! Turns raw [`JobArgs`] into validated, immutable [`SubmitParameters`].
//! Validation is all-or-nothing: either every check passes and parameters
//! are returned, or an error is returned and nothing else.

use std::str::FromStr;
use std::sync::OnceLock;

use arena_model::{Env, JobType, Quantity};
use regex_lite::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use super::args::{JobArgs, SubmitArgs, SyncArgs};
use crate::context::ArenaContext;
use crate::error::ArenaError;

/// Maximum length of a job name (DNS-1123 label).
pub const MAX_NAME_LEN: usize = 63;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("name pattern is valid")
    })
}

/// How source code reaches the training containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Rsync,
    Git,
}

impl FromStr for SyncMode {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rsync" => Ok(SyncMode::Rsync),
            "git" => Ok(SyncMode::Git),
            other => Err(ArenaError::validation(format!(
                "--sync-mode must be rsync or git, got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSource {
    pub mode: SyncMode,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Checkout directory name, git mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_project_name: Option<String>,
}

/// Validated fields shared by all job types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseParameters {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub command: String,
    pub envs: Env,
    #[serde(rename = "workers")]
    pub worker_count: u32,
    #[serde(rename = "gpus")]
    pub gpu_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncSource>,
}

/// Fields only one job type carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExtension {
    Horovod { ssh_port: u16 },
    Mpi,
    Tf { ps_count: u32, ps_image: String },
    Standalone,
}

/// Validated parameters for exactly one submission.
///
/// Only [`prepare`] constructs these; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitParameters {
    job_type: JobType,
    base: BaseParameters,
    extension: TypeExtension,
}

impl SubmitParameters {
    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn namespace(&self) -> &str {
        &self.base.namespace
    }

    pub fn base(&self) -> &BaseParameters {
        &self.base
    }

    pub fn extension(&self) -> &TypeExtension {
        &self.extension
    }

    pub fn worker_count(&self) -> u32 {
        self.base.worker_count
    }

    pub fn envs(&self) -> &Env {
        &self.base.envs
    }

    pub fn ssh_port(&self) -> Option<u16> {
        match self.extension {
            TypeExtension::Horovod { ssh_port } => Some(ssh_port),
            _ => None,
        }
    }

    /// Values document handed to chart rendering.
    pub fn to_values(&self) -> Result<Value, serde_json::Error> {
        let mut values = serde_json::to_value(&self.base)?;
        if let Value::Object(ref mut map) = values {
            map.insert("jobType".to_string(), json!(self.job_type));
            match &self.extension {
                TypeExtension::Horovod { ssh_port } => {
                    map.insert("sshPort".to_string(), json!(ssh_port));
                }
                TypeExtension::Tf { ps_count, ps_image } => {
                    map.insert("ps".to_string(), json!(ps_count));
                    map.insert("psImage".to_string(), json!(ps_image));
                }
                TypeExtension::Mpi | TypeExtension::Standalone => {}
            }
        }
        Ok(values)
    }

    /// Parameters as installed through the legacy release path.
    ///
    /// When the master also acts as a worker, the release chart adds it on
    /// its own, so one worker is taken off the requested count.
    pub fn for_release_install(&self) -> SubmitParameters {
        let mut params = self.clone();
        if self.job_type.master_is_worker() {
            params.base.worker_count = params.base.worker_count.saturating_sub(1);
        }
        params
    }
}

/// Validate `args` and build the parameters for one submission.
///
/// `command` is the trailing positional input, joined with spaces.
pub fn prepare(
    args: &JobArgs,
    command: &[String],
    ctx: &ArenaContext,
) -> Result<SubmitParameters, ArenaError> {
    let job_type = args.job_type();
    let base = args.base();
    let command = command.join(" ");

    let ssh_port = if job_type.needs_ephemeral_port() {
        let preferred = match args {
            JobArgs::Horovod(horovod) => horovod.ssh_port,
            _ => 0,
        };
        Some(ctx.ports.select_available_port(preferred)?)
    } else {
        None
    };

    let (cpu, memory) = check_base(base)?;
    let extension = check_type(args, ssh_port)?;
    let sync = transform_sync(&base.sync)?;

    let mut envs = Env::from_pairs(&base.envs)?;
    add_job_info_to_env(&mut envs, job_type, base, &extension);

    let params = SubmitParameters {
        job_type,
        base: BaseParameters {
            name: base.name.clone(),
            namespace: ctx.namespace.clone(),
            image: base.image.clone(),
            command,
            envs,
            worker_count: base.workers,
            gpu_count: base.gpus,
            cpu,
            memory,
            sync,
        },
        extension,
    };
    tracing::debug!(job = %params.name(), job_type = %job_type, "prepared submission");
    Ok(params)
}

fn check_base(base: &SubmitArgs) -> Result<(Option<Quantity>, Option<Quantity>), ArenaError> {
    check_name(&base.name)?;

    if base.image.trim().is_empty() {
        return Err(ArenaError::validation("--image must be set"));
    }

    if base.workers == 0 {
        return Err(ArenaError::validation("--workers must be at least 1"));
    }

    let cpu = Quantity::parse_optional("--cpu", &base.cpu)?;
    let memory = Quantity::parse_optional("--memory", &base.memory)?;
    Ok((cpu, memory))
}

fn check_name(name: &str) -> Result<(), ArenaError> {
    if name.is_empty() {
        return Err(ArenaError::validation("--name must be set"));
    }
    if name.len() > MAX_NAME_LEN || !name_pattern().is_match(name) {
        return Err(ArenaError::validation(format!(
            "--name '{}' must consist of lower case alphanumeric characters or '-', start and end with an alphanumeric character, and be at most {} characters",
            name, MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn check_type(args: &JobArgs, ssh_port: Option<u16>) -> Result<TypeExtension, ArenaError> {
    match args {
        JobArgs::Horovod(horovod) => {
            if horovod.base.image.is_empty() {
                return Err(ArenaError::validation("--image must be set for horovodjob"));
            }
            let ssh_port = ssh_port
                .ok_or_else(|| ArenaError::validation("no ssh port was allocated for horovodjob"))?;
            Ok(TypeExtension::Horovod { ssh_port })
        }
        JobArgs::Mpi(_) => Ok(TypeExtension::Mpi),
        JobArgs::Tf(tf) => {
            if tf.ps_count == 0 {
                return Err(ArenaError::validation("--ps must be at least 1 for tfjob"));
            }
            let ps_image = match tf.ps_image.as_deref() {
                Some(image) if !image.trim().is_empty() => image.to_string(),
                _ => tf.base.image.clone(),
            };
            Ok(TypeExtension::Tf {
                ps_count: tf.ps_count,
                ps_image,
            })
        }
        JobArgs::Standalone(standalone) => {
            if standalone.base.workers != 1 {
                return Err(ArenaError::validation(format!(
                    "standalonejob runs exactly one worker, got --workers {}",
                    standalone.base.workers
                )));
            }
            Ok(TypeExtension::Standalone)
        }
    }
}

fn transform_sync(sync: &SyncArgs) -> Result<Option<SyncSource>, ArenaError> {
    let mode = match sync.mode.as_deref() {
        None | Some("") => return Ok(None),
        Some(mode) => mode.parse::<SyncMode>()?,
    };

    let source = match sync.source.as_deref().map(str::trim) {
        Some(source) if !source.is_empty() => source.to_string(),
        _ => {
            return Err(ArenaError::validation(
                "--sync-source must be set when --sync-mode is given",
            ))
        }
    };

    let git_project_name = match mode {
        SyncMode::Git => Some(git_project_name(&source)?),
        SyncMode::Rsync => None,
    };

    Ok(Some(SyncSource {
        mode,
        source,
        image: sync.image.clone().filter(|image| !image.is_empty()),
        git_project_name,
    }))
}

/// Directory a git source checks out into: the last path segment minus `.git`.
fn git_project_name(source: &str) -> Result<String, ArenaError> {
    let segment = source
        .trim_end_matches('/')
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or_default();
    let project = segment.strip_suffix(".git").unwrap_or(segment);
    if project.is_empty() {
        return Err(ArenaError::validation(format!(
            "cannot derive a project name from --sync-source '{}'",
            source
        )));
    }
    Ok(project.to_string())
}

/// Entries the in-cluster runtime reads to configure itself.
///
/// These override user-supplied entries with the same key.
fn add_job_info_to_env(envs: &mut Env, job_type: JobType, base: &SubmitArgs, extension: &TypeExtension) {
    envs.insert("ARENA_JOB_NAME", base.name.as_str());
    envs.insert("ARENA_JOB_TYPE", job_type.as_str());
    envs.insert("workers", base.workers.to_string());
    envs.insert("gpus", base.gpus.to_string());

    match extension {
        TypeExtension::Horovod { ssh_port } => {
            envs.insert("SSH_PORT", ssh_port.to_string());
            envs.insert("MASTER_ADDR", format!("{}-master", base.name));
        }
        TypeExtension::Tf { ps_count, .. } => {
            envs.insert("PS_HOSTS_COUNT", ps_count.to_string());
        }
        TypeExtension::Mpi | TypeExtension::Standalone => {}
    }
}
