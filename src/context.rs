//! Per-invocation context
//!
//! Built once at startup and passed by reference to every component. Holds
//! the resolved namespace and the cluster collaborators.

use std::path::PathBuf;

use arena_model::JobType;

use crate::cluster::{
    ClusterPortAllocator, HelmInstaller, Kubectl, KubectlWorkflow, PortAllocator, ReleaseInstaller,
    VolumeLister, WorkflowClient,
};
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::mock::MockCluster;

pub struct ArenaContext {
    pub namespace: String,
    pub charts_dir: PathBuf,
    pub workflow: Box<dyn WorkflowClient>,
    pub releases: Box<dyn ReleaseInstaller>,
    pub ports: Box<dyn PortAllocator>,
    pub volumes: Box<dyn VolumeLister>,
}

impl ArenaContext {
    pub fn new(
        namespace: impl Into<String>,
        charts_dir: impl Into<PathBuf>,
        workflow: Box<dyn WorkflowClient>,
        releases: Box<dyn ReleaseInstaller>,
        ports: Box<dyn PortAllocator>,
        volumes: Box<dyn VolumeLister>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            charts_dir: charts_dir.into(),
            workflow,
            releases,
            ports,
            volumes,
        }
    }

    /// Context backed by kubectl and helm, as configured.
    ///
    /// The namespace comes from the config when set, otherwise from the
    /// current kubeconfig context.
    pub fn bootstrap(config: &ArenaConfig) -> Result<Self, ArenaError> {
        let kubectl = Kubectl::new(&config.kubectl_bin, config.kubeconfig.clone());

        let namespace = match config.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns.to_string(),
            _ => kubectl.current_namespace().map_err(ArenaError::Namespace)?,
        };
        tracing::debug!(namespace = %namespace, "using namespace");

        Ok(Self::new(
            namespace.clone(),
            &config.charts_dir,
            Box::new(KubectlWorkflow::new(kubectl.clone(), &config.helm_bin)),
            Box::new(HelmInstaller::new(
                &config.helm_bin,
                namespace,
                config.kubeconfig.clone(),
            )),
            Box::new(ClusterPortAllocator::new(kubectl.clone(), config.port_range)),
            Box::new(kubectl),
        ))
    }

    /// Context whose collaborators all share `mock`'s state.
    pub fn with_mock(mock: &MockCluster, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let scoped = mock.scoped(&namespace);
        Self::new(
            namespace,
            "/charts",
            Box::new(scoped.clone()),
            Box::new(scoped.clone()),
            Box::new(scoped.clone()),
            Box::new(scoped),
        )
    }

    /// Chart used to render jobs of `job_type`.
    pub fn chart_path(&self, job_type: JobType) -> PathBuf {
        let chart = match job_type {
            JobType::Standalone => "training",
            JobType::TfJob => "tfjob",
            JobType::MpiJob => "mpijob",
            JobType::HorovodJob => "tf-horovod",
        };
        self.charts_dir.join(chart)
    }
}
