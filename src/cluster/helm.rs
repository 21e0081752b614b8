//! helm-backed legacy release installer
//!
//! Legacy jobs are plain helm releases named after the job. They carry no
//! job type, so they can only be found or removed by name.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{run_command, write_values, ClusterError, ReleaseInstaller};
use crate::submit::SubmitParameters;

#[derive(Debug, Clone)]
pub struct HelmInstaller {
    bin: PathBuf,
    namespace: String,
    kubeconfig: Option<PathBuf>,
}

impl HelmInstaller {
    /// Create an installer; `namespace` scopes lookups and removals by name.
    pub fn new(bin: impl Into<PathBuf>, namespace: impl Into<String>, kubeconfig: Option<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            namespace: namespace.into(),
            kubeconfig,
        }
    }

    fn command(&self, namespace: &str) -> Command {
        let mut command = Command::new(&self.bin);
        if let Some(ref kubeconfig) = self.kubeconfig {
            command.arg("--kubeconfig").arg(kubeconfig);
        }
        command.arg("--namespace").arg(namespace);
        command
    }
}

impl ReleaseInstaller for HelmInstaller {
    fn install_release(
        &self,
        name: &str,
        namespace: &str,
        params: &SubmitParameters,
        chart: &Path,
    ) -> Result<(), ClusterError> {
        let values = write_values(params)?;
        let mut command = self.command(namespace);
        command
            .arg("install")
            .arg(name)
            .arg(chart)
            .arg("-f")
            .arg(values.path());
        run_command(command)?;
        Ok(())
    }

    fn delete_release(&self, name: &str) -> Result<(), ClusterError> {
        let mut command = self.command(&self.namespace);
        command.arg("uninstall").arg(name);
        run_command(command)?;
        Ok(())
    }

    fn check_release(&self, name: &str) -> Result<bool, ClusterError> {
        let mut command = self.command(&self.namespace);
        command
            .arg("list")
            .arg("--short")
            .arg("--all")
            .arg("--filter")
            .arg(format!("^{}$", name));
        let out = run_command(command)?;
        Ok(out.lines().any(|line| line.trim() == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_and_kubeconfig_lead_every_command() {
        let helm = HelmInstaller::new("helm", "team-a", Some(PathBuf::from("/tmp/kc")));
        let command = helm.command("team-a");
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args, vec!["--kubeconfig", "/tmp/kc", "--namespace", "team-a"]);
    }

    #[test]
    fn delete_with_missing_binary_fails() {
        let helm = HelmInstaller::new("arena-missing-helm", "default", None);
        assert!(matches!(
            helm.delete_release("mnist"),
            Err(ClusterError::Spawn { .. })
        ));
    }
}
