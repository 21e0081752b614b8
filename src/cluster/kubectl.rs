//! kubectl-backed workflow client
//!
//! A submitted job is the chart rendered with `helm template` and created with
//! `kubectl create`. The rendered manifest is recorded in a ConfigMap named
//! `<job>-<type>`, which is also how a job's type is discovered later.

use std::path::{Path, PathBuf};
use std::process::Command;

use arena_model::JobType;

use super::{run_command, write_values, ClusterError, JobSummary, ScratchFile, WorkflowClient};
use crate::submit::SubmitParameters;

/// Label put on every ConfigMap that records an arena job.
pub const ARENA_CREATED_BY_LABEL: &str = "createdBy=arena";

/// Key under which the rendered manifest is stored in the ConfigMap.
const MANIFEST_KEY: &str = "app";

/// Thin wrapper around the `kubectl` binary.
#[derive(Debug, Clone)]
pub struct Kubectl {
    bin: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl Kubectl {
    pub fn new(bin: impl Into<PathBuf>, kubeconfig: Option<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            kubeconfig,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.bin);
        if let Some(ref kubeconfig) = self.kubeconfig {
            command.arg("--kubeconfig").arg(kubeconfig);
        }
        command
    }

    /// Run kubectl with the given arguments and return stdout.
    pub fn run<I, S>(&self, args: I) -> Result<String, ClusterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = self.command();
        command.args(args);
        run_command(command)
    }

    /// Namespace of the current kubeconfig context, `default` when unset.
    pub fn current_namespace(&self) -> Result<String, ClusterError> {
        let out = self.run(["config", "view", "--minify", "-o", "jsonpath={..namespace}"])?;
        let namespace = out.trim();
        if namespace.is_empty() {
            Ok("default".to_string())
        } else {
            Ok(namespace.to_string())
        }
    }
}

/// Workflow client that creates jobs from rendered charts.
#[derive(Debug, Clone)]
pub struct KubectlWorkflow {
    kubectl: Kubectl,
    helm_bin: PathBuf,
}

impl KubectlWorkflow {
    pub fn new(kubectl: Kubectl, helm_bin: impl Into<PathBuf>) -> Self {
        Self {
            kubectl,
            helm_bin: helm_bin.into(),
        }
    }

    /// Name of the ConfigMap that records a job of the given type.
    pub fn record_name(name: &str, job_type: JobType) -> String {
        format!("{}-{}", name, job_type)
    }

    fn render(
        &self,
        name: &str,
        namespace: &str,
        params: &SubmitParameters,
        chart: &Path,
    ) -> Result<String, ClusterError> {
        let values = write_values(params)?;
        let mut command = Command::new(&self.helm_bin);
        command
            .arg("template")
            .arg(name)
            .arg(chart)
            .arg("-f")
            .arg(values.path())
            .arg("--namespace")
            .arg(namespace);
        let manifest = run_command(command)?;
        if manifest.trim().is_empty() {
            return Err(ClusterError::UnexpectedOutput {
                program: self.helm_bin.display().to_string(),
                detail: format!("chart {} rendered no resources", chart.display()),
            });
        }
        Ok(manifest)
    }

    /// Remove whatever a failed submission left behind.
    ///
    /// A half-written record must go too, or `find_job` would report the job.
    fn rollback(&self, name: &str, namespace: &str, manifest_path: &str, record: &str) {
        let steps: [[&str; 6]; 2] = [
            ["delete", "-f", manifest_path, "--namespace", namespace, "--ignore-not-found"],
            ["delete", "configmap", record, "--namespace", namespace, "--ignore-not-found"],
        ];
        for args in steps {
            if let Err(e) = self.kubectl.run(args) {
                tracing::error!(job = name, error = %e, "rollback failed");
            }
        }
    }
}

/// Parse record ConfigMap names (`<job>-<type>`) into job summaries.
///
/// Names without a known type suffix are skipped.
pub(crate) fn parse_job_records(output: &str) -> Vec<JobSummary> {
    let mut jobs: Vec<JobSummary> = output
        .split_whitespace()
        .filter_map(|record| {
            let record = record.strip_prefix("configmap/").unwrap_or(record);
            JobType::ALL.iter().find_map(|job_type| {
                record
                    .strip_suffix(job_type.as_str())
                    .and_then(|rest| rest.strip_suffix('-'))
                    .filter(|name| !name.is_empty())
                    .map(|name| JobSummary {
                        name: name.to_string(),
                        job_type: *job_type,
                    })
            })
        })
        .collect();
    jobs.sort();
    jobs
}

impl WorkflowClient for KubectlWorkflow {
    fn submit_job(
        &self,
        name: &str,
        job_type: JobType,
        namespace: &str,
        params: &SubmitParameters,
        chart: &Path,
    ) -> Result<(), ClusterError> {
        let manifest = self.render(name, namespace, params, chart)?;
        let manifest_file = ScratchFile::write("yaml", manifest.as_bytes())?;
        let manifest_path = manifest_file.path().display().to_string();

        self.kubectl
            .run(["create", "-f", manifest_path.as_str(), "--namespace", namespace])?;

        let record = Self::record_name(name, job_type);
        let from_file = format!("--from-file={}={}", MANIFEST_KEY, manifest_path);
        let recorded = self
            .kubectl
            .run(["create", "configmap", record.as_str(), from_file.as_str(), "--namespace", namespace])
            .and_then(|_| {
                self.kubectl.run([
                    "label",
                    "configmap",
                    record.as_str(),
                    ARENA_CREATED_BY_LABEL,
                    "--namespace",
                    namespace,
                ])
            });

        if let Err(e) = recorded {
            tracing::warn!(job = name, error = %e, "failed to record job, rolling back created resources");
            self.rollback(name, namespace, &manifest_path, &record);
            return Err(e);
        }

        Ok(())
    }

    fn delete_job(&self, name: &str, namespace: &str, job_type: JobType) -> Result<(), ClusterError> {
        let record = Self::record_name(name, job_type);
        let jsonpath = format!("jsonpath={{.data.{}}}", MANIFEST_KEY);
        let manifest = self
            .kubectl
            .run(["get", "configmap", record.as_str(), "--namespace", namespace, "-o", jsonpath.as_str()])?;

        if manifest.trim().is_empty() {
            tracing::warn!(job = name, record = %record, "job record holds no manifest");
        } else {
            let manifest_file = ScratchFile::write("yaml", manifest.as_bytes())?;
            let manifest_path = manifest_file.path().display().to_string();
            self.kubectl.run([
                "delete",
                "-f",
                manifest_path.as_str(),
                "--namespace",
                namespace,
                "--ignore-not-found",
            ])?;
        }

        self.kubectl
            .run(["delete", "configmap", record.as_str(), "--namespace", namespace])?;
        Ok(())
    }

    fn find_job(&self, name: &str, namespace: &str, job_type: JobType) -> Result<bool, ClusterError> {
        let record = Self::record_name(name, job_type);
        let out = self.kubectl.run([
            "get",
            "configmap",
            record.as_str(),
            "--namespace",
            namespace,
            "--ignore-not-found",
            "-o",
            "name",
        ])?;
        Ok(!out.trim().is_empty())
    }

    fn list_jobs(&self, namespace: &str) -> Result<Vec<JobSummary>, ClusterError> {
        let selector = format!("--selector={}", ARENA_CREATED_BY_LABEL);
        let out = self.kubectl.run([
            "get",
            "configmap",
            selector.as_str(),
            "--namespace",
            namespace,
            "-o",
            "jsonpath={.items[*].metadata.name}",
        ])?;
        Ok(parse_job_records(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_name_joins_job_and_type() {
        assert_eq!(
            KubectlWorkflow::record_name("mnist", JobType::HorovodJob),
            "mnist-horovodjob"
        );
        assert_eq!(KubectlWorkflow::record_name("a", JobType::Standalone), "a-standalonejob");
    }

    #[test]
    fn kubeconfig_is_passed_first() {
        let kubectl = Kubectl::new("kubectl", Some(PathBuf::from("/tmp/kc")));
        let command = kubectl.command();
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args, vec!["--kubeconfig", "/tmp/kc"]);
    }

    #[test]
    fn record_names_parse_back_into_jobs() {
        let jobs = parse_job_records("mnist-mpijob configmap/a-b-tfjob junk-config -horovodjob");
        assert_eq!(
            jobs,
            vec![
                JobSummary {
                    name: "a-b".to_string(),
                    job_type: JobType::TfJob,
                },
                JobSummary {
                    name: "mnist".to_string(),
                    job_type: JobType::MpiJob,
                },
            ]
        );
        assert!(parse_job_records("").is_empty());
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let workflow = KubectlWorkflow::new(Kubectl::new("arena-missing-kubectl", None), "helm");
        let err = workflow.find_job("mnist", "default", JobType::TfJob).unwrap_err();
        assert!(matches!(err, ClusterError::Spawn { .. }));
    }

    #[cfg(unix)]
    mod fake_binaries {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        use crate::context::ArenaContext;
        use crate::mock::MockCluster;
        use crate::submit::{prepare, JobArgs, MpiArgs, SubmitArgs};

        /// Write an executable shell script into `dir`.
        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        /// A kubectl that logs its arguments and fails on `fail_on`.
        fn fake_kubectl(dir: &Path, log: &Path, fail_on: &str) -> PathBuf {
            script(
                dir,
                "kubectl",
                &format!(
                    "echo \"$*\" >> {log}\ncase \"$1\" in {fail_on}) echo denied >&2; exit 1;; esac\nexit 0\n",
                    log = log.display(),
                    fail_on = fail_on,
                ),
            )
        }

        fn params() -> SubmitParameters {
            let ctx = ArenaContext::with_mock(&MockCluster::new(), "default");
            let args = JobArgs::Mpi(MpiArgs {
                base: SubmitArgs {
                    name: "mnist".to_string(),
                    image: "registry/train:1".to_string(),
                    ..Default::default()
                },
            });
            prepare(&args, &["python".to_string(), "train.py".to_string()], &ctx).unwrap()
        }

        #[test]
        fn failed_label_rolls_back_manifest_and_record() {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("calls.log");
            let kubectl = fake_kubectl(dir.path(), &log, "label");
            let helm = script(dir.path(), "helm", "echo 'kind: MPIJob'\n");

            let workflow = KubectlWorkflow::new(Kubectl::new(kubectl, None), helm);
            let err = workflow
                .submit_job("mnist", JobType::MpiJob, "default", &params(), Path::new("/charts/mpijob"))
                .unwrap_err();
            assert!(matches!(err, ClusterError::CommandFailed { .. }));

            let calls = fs::read_to_string(&log).unwrap();
            let calls: Vec<&str> = calls.lines().collect();
            assert_eq!(calls.len(), 5, "calls: {calls:?}");
            assert!(calls[0].starts_with("create -f "));
            assert!(calls[1].starts_with("create configmap mnist-mpijob "));
            assert!(calls[2].starts_with("label configmap mnist-mpijob "));
            assert!(calls[3].starts_with("delete -f "));
            assert_eq!(
                calls[4],
                "delete configmap mnist-mpijob --namespace default --ignore-not-found"
            );
        }

        #[test]
        fn successful_submit_leaves_resources_in_place() {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("calls.log");
            let kubectl = fake_kubectl(dir.path(), &log, "never");
            let helm = script(dir.path(), "helm", "echo 'kind: MPIJob'\n");

            let workflow = KubectlWorkflow::new(Kubectl::new(kubectl, None), helm);
            workflow
                .submit_job("mnist", JobType::MpiJob, "default", &params(), Path::new("/charts/mpijob"))
                .unwrap();

            let calls = fs::read_to_string(&log).unwrap();
            assert_eq!(calls.lines().count(), 3);
            assert!(!calls.contains("delete"));
        }

        #[test]
        fn list_selects_arena_records() {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("calls.log");
            let kubectl = script(
                dir.path(),
                "kubectl",
                &format!("echo \"$*\" >> {}\necho 'mnist-mpijob solo-standalonejob'\n", log.display()),
            );

            let workflow = KubectlWorkflow::new(Kubectl::new(kubectl, None), "helm");
            let jobs = workflow.list_jobs("team-a").unwrap();
            assert_eq!(jobs.len(), 2);
            assert_eq!(jobs[1].job_type, JobType::Standalone);

            let calls = fs::read_to_string(&log).unwrap();
            assert!(calls.contains("--selector=createdBy=arena"));
            assert!(calls.contains("--namespace team-a"));
        }
    }
}
