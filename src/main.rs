//! Arena CLI
//!
//! Entry point for the `arena` command-line tool.

use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::{Args, CommandFactory, Parser, Subcommand};
use serde_json::{json, Map, Value};

use arena::submit::{HorovodArgs, MpiArgs, StandaloneArgs, SubmitArgs, SyncArgs, TfArgs};
use arena::listing;
use arena::{
    init_logger, ArenaConfig, ArenaContext, DeletionOrchestrator, JobArgs, JobType, SubmitBackend,
    Submitter,
};

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Submit and manage distributed training jobs", version)]
struct Cli {
    /// Log filter, e.g. debug or arena=debug,warn
    #[arg(long, global = true)]
    loglevel: Option<String>,

    /// Path to config file (default: ~/.config/arena/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Namespace to act in (default: the kubeconfig context's namespace)
    #[arg(long, short = 'n', global = true)]
    namespace: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a training job
    Submit {
        #[command(subcommand)]
        job: SubmitCommands,
    },

    /// Delete training jobs and their associated pods
    Delete {
        /// Names of the jobs to delete
        names: Vec<String>,

        /// The job type to delete: tfjob, mpijob, horovodjob or standalonejob
        #[arg(long = "type", value_parser = JobType::from_str)]
        job_type: Option<JobType>,

        /// Exit non-zero when any name could not be deleted
        #[arg(long)]
        strict: bool,
    },

    /// List training jobs created by arena
    #[command(visible_alias = "ls")]
    List,

    /// Manage data volumes
    Data {
        #[command(subcommand)]
        command: Option<DataCommands>,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// List the data volumes
    #[command(visible_alias = "ls")]
    List,
}

#[derive(Subcommand)]
enum SubmitCommands {
    /// Submit a horovod job
    #[command(name = "horovodjob", visible_alias = "hj")]
    Horovod {
        #[command(flatten)]
        common: CommonFlags,
        #[command(flatten)]
        resources: ResourceFlags,

        /// SSH port for the job, 0 to pick a free one
        #[arg(long = "sshPort", default_value_t = 0)]
        ssh_port: u16,

        /// Install as a legacy release instead of workflow resources
        #[arg(long)]
        legacy_release: bool,
    },

    /// Submit an MPI job
    #[command(name = "mpijob", visible_alias = "mpi")]
    Mpi {
        #[command(flatten)]
        common: CommonFlags,
        #[command(flatten)]
        resources: ResourceFlags,
    },

    /// Submit a TensorFlow job with parameter servers
    #[command(name = "tfjob", visible_alias = "tf")]
    Tf {
        #[command(flatten)]
        common: CommonFlags,
        #[command(flatten)]
        resources: ResourceFlags,

        /// Number of parameter servers
        #[arg(long = "ps", default_value_t = 1)]
        ps_count: u32,

        /// Parameter server image (default: --image)
        #[arg(long)]
        ps_image: Option<String>,
    },

    /// Submit a single-worker job
    #[command(name = "standalonejob", visible_alias = "sj")]
    Standalone {
        #[command(flatten)]
        common: CommonFlags,
        #[command(flatten)]
        resources: ResourceFlags,
    },
}

#[derive(Args)]
struct CommonFlags {
    /// Job name
    #[arg(long, default_value = "")]
    name: String,

    /// Container image
    #[arg(long, default_value = "")]
    image: String,

    /// Number of workers
    #[arg(long, default_value_t = 1)]
    workers: u32,

    /// GPUs per worker
    #[arg(long, default_value_t = 0)]
    gpus: u32,

    /// Environment variable as KEY=VALUE (repeatable)
    #[arg(long = "env", short = 'e')]
    envs: Vec<String>,

    /// Source sync mode: rsync or git
    #[arg(long)]
    sync_mode: Option<String>,

    /// Source to sync: rsync path or git repository URL
    #[arg(long)]
    sync_source: Option<String>,

    /// Image used to perform the sync
    #[arg(long)]
    sync_image: Option<String>,

    /// Command to run in the job
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(Args)]
struct ResourceFlags {
    /// CPU request, e.g. 1 or 500m
    #[arg(long, default_value = "")]
    cpu: String,

    /// Memory request, e.g. 1Gi
    #[arg(long, default_value = "")]
    memory: String,
}

impl CommonFlags {
    fn into_submit_args(self, resources: ResourceFlags) -> (SubmitArgs, Vec<String>) {
        let args = SubmitArgs {
            name: self.name,
            image: self.image,
            workers: self.workers,
            gpus: self.gpus,
            cpu: resources.cpu,
            memory: resources.memory,
            envs: self.envs,
            sync: SyncArgs {
                mode: self.sync_mode,
                source: self.sync_source,
                image: self.sync_image,
            },
        };
        (args, self.command)
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match ArenaConfig::load(cli.config.as_deref(), cli_layer(&cli)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = init_logger(&config.logging) {
        eprintln!("Warning: {}", e);
    }

    match cli.command {
        Commands::Submit { job } => run_submit(&config, job),
        Commands::Delete {
            names,
            job_type,
            strict,
        } => run_delete(&config, names, job_type, strict),
        Commands::List => run_list(&config),
        Commands::Data { command } => match command {
            Some(DataCommands::List) => run_data_list(&config),
            None => exit_with_help(&["data"]),
        },
    }
}

/// CLI flags that override config values.
fn cli_layer(cli: &Cli) -> Value {
    let mut map = Map::new();
    if let Some(ns) = &cli.namespace {
        map.insert("namespace".to_string(), json!(ns));
    }
    if let Some(path) = &cli.kubeconfig {
        map.insert("kubeconfig".to_string(), json!(path));
    }
    if let Some(level) = &cli.loglevel {
        map.insert("logging".to_string(), json!({ "level": level }));
    }
    Value::Object(map)
}

fn bootstrap(config: &ArenaConfig) -> ArenaContext {
    match ArenaContext::bootstrap(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::debug!("Failed due to {}", e);
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Print help for a subcommand path and exit 1.
fn exit_with_help(path: &[&str]) -> ! {
    let mut cmd = Cli::command();
    for name in path {
        match cmd.find_subcommand(name) {
            Some(sub) => cmd = sub.clone(),
            None => break,
        }
    }
    if let Err(e) = cmd.print_help() {
        eprintln!("{}", e);
    }
    process::exit(1);
}

fn run_submit(config: &ArenaConfig, job: SubmitCommands) {
    let (args, command, backend, help_path) = match job {
        SubmitCommands::Horovod {
            common,
            resources,
            ssh_port,
            legacy_release,
        } => {
            let (base, command) = common.into_submit_args(resources);
            let backend = if legacy_release {
                SubmitBackend::Release
            } else {
                SubmitBackend::Workflow
            };
            (
                JobArgs::Horovod(HorovodArgs { base, ssh_port }),
                command,
                backend,
                "horovodjob",
            )
        }
        SubmitCommands::Mpi { common, resources } => {
            let (base, command) = common.into_submit_args(resources);
            (
                JobArgs::Mpi(MpiArgs { base }),
                command,
                SubmitBackend::Workflow,
                "mpijob",
            )
        }
        SubmitCommands::Tf {
            common,
            resources,
            ps_count,
            ps_image,
        } => {
            let (base, command) = common.into_submit_args(resources);
            (
                JobArgs::Tf(TfArgs {
                    base,
                    ps_count,
                    ps_image,
                }),
                command,
                SubmitBackend::Workflow,
                "tfjob",
            )
        }
        SubmitCommands::Standalone { common, resources } => {
            let (base, command) = common.into_submit_args(resources);
            (
                JobArgs::Standalone(StandaloneArgs { base }),
                command,
                SubmitBackend::Workflow,
                "standalonejob",
            )
        }
    };

    if command.is_empty() {
        exit_with_help(&["submit", help_path]);
    }

    let ctx = bootstrap(config);
    if let Err(e) = Submitter::new(&ctx).submit(&args, &command, backend) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run_delete(config: &ArenaConfig, names: Vec<String>, job_type: Option<JobType>, strict: bool) {
    if names.is_empty() {
        exit_with_help(&["delete"]);
    }

    let ctx = bootstrap(config);
    let report = DeletionOrchestrator::new(&ctx).delete_all(&names, job_type);
    if strict && !report.all_succeeded() {
        process::exit(1);
    }
}

fn run_list(config: &ArenaConfig) {
    let ctx = bootstrap(config);
    match listing::list_jobs(&ctx) {
        Ok(jobs) => print!("{}", listing::render_jobs(&jobs)),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn run_data_list(config: &ArenaConfig) {
    let ctx = bootstrap(config);
    match listing::list_volumes(&ctx) {
        Ok(volumes) => print!("{}", listing::render_volumes(&volumes, chrono::Utc::now())),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
