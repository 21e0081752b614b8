//! Layered configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, else `~/.config/arena/config.toml` when present)
//! 3. Environment (`ARENA_NAMESPACE`, `KUBECONFIG`, `ARENA_CHARTS_DIR`)
//! 4. CLI flags

mod defaults;
mod merge;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cluster::PortRange;
use crate::logging::LoggerConfig;

pub use defaults::{DEFAULT_CHARTS_DIR, DEFAULT_HELM_BIN, DEFAULT_KUBECTL_BIN};
pub use merge::{deep_merge, merge_layers};

/// Environment variables read into the environment layer, with the key each sets.
const ENV_KEYS: [(&str, &str); 3] = [
    ("ARENA_NAMESPACE", "namespace"),
    ("KUBECONFIG", "kubeconfig"),
    ("ARENA_CHARTS_DIR", "charts_dir"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Namespace to act in; the kubeconfig context's namespace when unset
    pub namespace: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub kubectl_bin: PathBuf,
    pub helm_bin: PathBuf,
    /// Directory holding one chart per job type
    pub charts_dir: PathBuf,
    /// Range ephemeral SSH ports are drawn from
    pub port_range: PortRange,
    pub logging: LoggerConfig,
}

impl ArenaConfig {
    /// Load from the process environment and the usual file locations.
    ///
    /// An explicit `config_path` must exist; the default path is skipped
    /// when absent.
    pub fn load(config_path: Option<&Path>, cli: Value) -> Result<Self, ConfigError> {
        let (path, required) = match config_path {
            Some(p) => (Some(p.to_path_buf()), true),
            None => (default_config_path(), false),
        };
        Self::build(path.as_deref(), required, |key| std::env::var(key).ok(), cli)
    }

    /// Merge all layers with an injectable environment lookup.
    pub fn build<F>(
        file: Option<&Path>,
        required: bool,
        env: F,
        cli: Value,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layers = vec![serde_json::to_value(Self::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?];

        if let Some(path) = file {
            if required || path.exists() {
                tracing::debug!(path = %path.display(), "loading config file");
                layers.push(load_toml_file(path)?);
            }
        }

        layers.push(env_layer(env));
        layers.push(cli);

        let merged = merge_layers(layers);
        let config: ArenaConfig =
            serde_json::from_value(merged).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.port_range.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "port_range must satisfy 0 < min < max, got [{}, {})",
                self.port_range.min, self.port_range.max
            )));
        }
        if self.kubectl_bin.as_os_str().is_empty() || self.helm_bin.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "kubectl_bin and helm_bin must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `$HOME/.config/arena/config.toml`, when `HOME` is set.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/arena/config.toml"))
}

fn env_layer<F>(env: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut map = Map::new();
    for (var, key) in ENV_KEYS {
        if let Some(value) = env(var).filter(|v| !v.is_empty()) {
            map.insert(key.to_string(), Value::String(value));
        }
    }
    Value::Object(map)
}

fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Value = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml_to_json(table))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LoggerFormat;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_only() {
        let config = ArenaConfig::build(None, false, no_env, json!({})).unwrap();
        assert_eq!(config, ArenaConfig::default());
    }

    #[test]
    fn test_file_env_cli_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
namespace = "from-file"
charts_dir = "/opt/charts"

[port_range]
min = 31000
max = 32000

[logging]
format = "json"
"#
        )
        .unwrap();

        let env: HashMap<&str, &str> =
            [("ARENA_NAMESPACE", "from-env"), ("KUBECONFIG", "/tmp/kube")].into();
        let config = ArenaConfig::build(
            Some(file.path()),
            true,
            |k| env.get(k).map(|v| v.to_string()),
            json!({"logging": {"level": "debug"}}),
        )
        .unwrap();

        assert_eq!(config.namespace.as_deref(), Some("from-env"));
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kube")));
        assert_eq!(config.charts_dir, PathBuf::from("/opt/charts"));
        assert_eq!(config.port_range, PortRange { min: 31000, max: 32000 });
        assert_eq!(config.logging.format, LoggerFormat::Json);
        assert_eq!(config.logging.level.as_str(), "debug");

        let config = ArenaConfig::build(
            Some(file.path()),
            true,
            |k| env.get(k).map(|v| v.to_string()),
            json!({"namespace": "from-cli"}),
        )
        .unwrap();
        assert_eq!(config.namespace.as_deref(), Some("from-cli"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config = ArenaConfig::build(
            None,
            false,
            |k| (k == "ARENA_NAMESPACE").then(String::new),
            json!({}),
        )
        .unwrap();
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(matches!(
            ArenaConfig::build(Some(&path), true, no_env, json!({})),
            Err(ConfigError::Io { .. })
        ));
        assert!(ArenaConfig::build(Some(&path), false, no_env, json!({})).is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespace = ").unwrap();
        assert!(matches!(
            ArenaConfig::build(Some(file.path()), true, no_env, json!({})),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn test_invalid_port_range() {
        let err = ArenaConfig::build(
            None,
            false,
            no_env,
            json!({"port_range": {"min": 30000, "max": 20000}}),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let err = ArenaConfig::build(None, false, no_env, json!({"port_range": {"min": "low"}}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
