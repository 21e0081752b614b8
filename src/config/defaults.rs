//! Built-in defaults (lowest layer)

use std::path::PathBuf;

use crate::cluster::PortRange;
use crate::logging::LoggerConfig;

use super::ArenaConfig;

pub const DEFAULT_KUBECTL_BIN: &str = "kubectl";
pub const DEFAULT_HELM_BIN: &str = "helm";
pub const DEFAULT_CHARTS_DIR: &str = "/charts";

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            kubeconfig: None,
            kubectl_bin: PathBuf::from(DEFAULT_KUBECTL_BIN),
            helm_bin: PathBuf::from(DEFAULT_HELM_BIN),
            charts_dir: PathBuf::from(DEFAULT_CHARTS_DIR),
            port_range: PortRange::default(),
            logging: LoggerConfig::default(),
        }
    }
}
