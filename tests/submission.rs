//! Submission flow tests
//!
//! Drive `Submitter` end to end against the in-memory cluster.

use arena::mock::{MockCluster, Operation};
use arena::submit::{HorovodArgs, MpiArgs, StandaloneArgs, SubmitArgs, TfArgs};
use arena::{ArenaContext, ArenaError, JobArgs, JobType, SubmitBackend, Submitter};

fn base(name: &str) -> SubmitArgs {
    SubmitArgs {
        name: name.to_string(),
        image: "registry/train:1".to_string(),
        ..Default::default()
    }
}

fn command() -> Vec<String> {
    vec!["python".to_string(), "train.py".to_string(), "--epochs=3".to_string()]
}

fn horovod(name: &str, workers: u32) -> JobArgs {
    JobArgs::Horovod(HorovodArgs {
        base: SubmitArgs {
            workers,
            ..base(name)
        },
        ssh_port: 0,
    })
}

// =============================================================================
// Happy path
// =============================================================================

#[test]
fn test_mpijob_is_submitted_with_joined_command() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "team-a");

    let params = Submitter::new(&ctx)
        .submit(&JobArgs::Mpi(MpiArgs { base: base("mnist") }), &command(), SubmitBackend::Workflow)
        .unwrap();

    assert_eq!(params.base().command, "python train.py --epochs=3");
    assert_eq!(params.namespace(), "team-a");
    assert!(mock.has_job("mnist", "team-a", JobType::MpiJob));

    let stored = mock.submitted_params("mnist", "team-a", JobType::MpiJob).unwrap();
    assert_eq!(stored, params);
}

#[test]
fn test_empty_quantities_and_envs_are_accepted() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "default");

    let params = Submitter::new(&ctx)
        .submit(
            &JobArgs::Standalone(StandaloneArgs { base: base("solo") }),
            &command(),
            SubmitBackend::Workflow,
        )
        .unwrap();

    assert!(params.base().cpu.is_none());
    assert!(params.base().memory.is_none());
    assert_eq!(params.envs().get("ARENA_JOB_TYPE"), Some("standalonejob"));
}

#[test]
fn test_horovod_gets_a_free_ssh_port() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "default");

    let params = Submitter::new(&ctx)
        .submit(&horovod("hvd", 2), &command(), SubmitBackend::Workflow)
        .unwrap();

    let port = params.ssh_port().unwrap();
    assert!((20000..30000).contains(&port));
    assert_eq!(params.envs().get("SSH_PORT"), Some(port.to_string().as_str()));
    assert_eq!(mock.calls(Operation::SelectPort), 1);
}

#[test]
fn test_user_env_entries_merge_last_wins() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "default");
    let args = JobArgs::Tf(TfArgs {
        base: SubmitArgs {
            envs: vec!["A=1".to_string(), "A=2".to_string(), "B=x=y".to_string()],
            ..base("tf-env")
        },
        ps_count: 2,
        ps_image: None,
    });

    let params = Submitter::new(&ctx)
        .submit(&args, &command(), SubmitBackend::Workflow)
        .unwrap();

    assert_eq!(params.envs().get("A"), Some("2"));
    assert_eq!(params.envs().get("B"), Some("x=y"));
    assert_eq!(params.envs().get("PS_HOSTS_COUNT"), Some("2"));
}

// =============================================================================
// Guard
// =============================================================================

#[test]
fn test_duplicate_name_is_refused_before_any_mutation() {
    let mock = MockCluster::new();
    mock.add_job("mnist", "default", JobType::HorovodJob);
    let ctx = ArenaContext::with_mock(&mock, "default");

    let err = Submitter::new(&ctx)
        .submit(&horovod("mnist", 2), &command(), SubmitBackend::Workflow)
        .unwrap_err();

    assert!(matches!(err, ArenaError::AlreadyExists { .. }));
    assert_eq!(
        err.to_string(),
        "the job mnist already exists, please delete it first via 'arena delete mnist'"
    );
    assert_eq!(mock.mutating_calls(), 0);
}

#[test]
fn test_same_name_of_another_type_is_allowed() {
    let mock = MockCluster::new();
    mock.add_job("mnist", "default", JobType::TfJob);
    let ctx = ArenaContext::with_mock(&mock, "default");

    Submitter::new(&ctx)
        .submit(&JobArgs::Mpi(MpiArgs { base: base("mnist") }), &command(), SubmitBackend::Workflow)
        .unwrap();
    assert_eq!(mock.job_count(), 2);
}

#[test]
fn test_invalid_input_never_reaches_the_cluster() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "default");
    let args = JobArgs::Mpi(MpiArgs {
        base: SubmitArgs {
            image: String::new(),
            ..base("mnist")
        },
    });

    let err = Submitter::new(&ctx)
        .submit(&args, &command(), SubmitBackend::Workflow)
        .unwrap_err();

    assert!(matches!(err, ArenaError::Validation(_)));
    assert_eq!(mock.calls(Operation::FindJob), 0);
    assert_eq!(mock.mutating_calls(), 0);
}

#[test]
fn test_empty_image_fails_on_the_port_allocating_path() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "default");
    let args = JobArgs::Horovod(HorovodArgs {
        base: SubmitArgs {
            image: String::new(),
            ..base("hvd")
        },
        ssh_port: 0,
    });

    let err = Submitter::new(&ctx)
        .submit(&args, &command(), SubmitBackend::Workflow)
        .unwrap_err();

    assert!(matches!(err, ArenaError::Validation(_)));
    assert_eq!(mock.calls(Operation::FindJob), 0);
    assert_eq!(mock.mutating_calls(), 0);
}

#[test]
fn test_empty_image_fails_alongside_other_bad_fields() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "default");
    let args = JobArgs::Standalone(StandaloneArgs {
        base: SubmitArgs {
            name: String::new(),
            image: String::new(),
            cpu: "lots".to_string(),
            envs: vec!["NOEQUALS".to_string()],
            ..Default::default()
        },
    });

    let err = Submitter::new(&ctx)
        .submit(&args, &command(), SubmitBackend::Workflow)
        .unwrap_err();

    assert!(matches!(err, ArenaError::Validation(_)));
    assert_eq!(mock.mutating_calls(), 0);
}

#[test]
fn test_listed_jobs_include_new_submission() {
    let mock = MockCluster::new();
    mock.add_job("old", "default", JobType::TfJob);
    let ctx = ArenaContext::with_mock(&mock, "default");

    Submitter::new(&ctx)
        .submit(&JobArgs::Mpi(MpiArgs { base: base("mnist") }), &command(), SubmitBackend::Workflow)
        .unwrap();

    let jobs = arena::listing::list_jobs(&ctx).unwrap();
    let listed: Vec<_> = jobs.iter().map(|j| (j.name.as_str(), j.job_type)).collect();
    assert_eq!(listed, vec![("mnist", JobType::MpiJob), ("old", JobType::TfJob)]);
}

#[test]
fn test_workflow_failure_is_surfaced() {
    let mock = MockCluster::new();
    mock.inject_failure(Operation::SubmitJob, "admission webhook denied");
    let ctx = ArenaContext::with_mock(&mock, "default");

    let err = Submitter::new(&ctx)
        .submit(&JobArgs::Mpi(MpiArgs { base: base("mnist") }), &command(), SubmitBackend::Workflow)
        .unwrap_err();

    assert!(matches!(err, ArenaError::Collaborator { .. }));
    assert!(err.to_string().contains("admission webhook denied"));
    assert_eq!(mock.job_count(), 0);
}

#[test]
fn test_taken_preferred_port_fails_submission() {
    let mock = MockCluster::new();
    mock.mark_port_used(22022);
    let ctx = ArenaContext::with_mock(&mock, "default");
    let args = JobArgs::Horovod(HorovodArgs {
        base: base("hvd"),
        ssh_port: 22022,
    });

    let err = Submitter::new(&ctx)
        .submit(&args, &command(), SubmitBackend::Workflow)
        .unwrap_err();
    assert!(matches!(err, ArenaError::PortAllocation(_)));
    assert_eq!(mock.mutating_calls(), 0);
}

// =============================================================================
// Legacy release path
// =============================================================================

#[test]
fn test_release_install_takes_master_off_worker_count() {
    let mock = MockCluster::new();
    let ctx = ArenaContext::with_mock(&mock, "default");

    let installed = Submitter::new(&ctx)
        .submit(&horovod("legacy", 4), &command(), SubmitBackend::Release)
        .unwrap();

    assert_eq!(installed.worker_count(), 3);
    assert_eq!(installed.envs().get("workers"), Some("4"));
    assert!(mock.has_release("legacy", "default"));
    assert_eq!(mock.installed_params("legacy", "default").unwrap().worker_count(), 3);
    assert_eq!(mock.calls(Operation::SubmitJob), 0);
}

#[test]
fn test_existing_release_blocks_install() {
    let mock = MockCluster::new();
    mock.add_release("legacy", "default");
    let ctx = ArenaContext::with_mock(&mock, "default");

    let err = Submitter::new(&ctx)
        .submit(&horovod("legacy", 2), &command(), SubmitBackend::Release)
        .unwrap_err();
    assert!(matches!(err, ArenaError::AlreadyExists { .. }));
    assert_eq!(mock.calls(Operation::InstallRelease), 0);
}
