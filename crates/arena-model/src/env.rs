//! Environment map injected into training containers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ModelError, ModelResult};
use crate::ENV_DELIMITER;

/// Environment variables for a job.
///
/// Keys are unique; inserting an existing key replaces its value.
/// Serialized as a plain JSON object with keys in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(BTreeMap<String, String>);

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `KEY=VALUE` entries, later entries overriding earlier ones.
    ///
    /// Entries are split on the first delimiter, so values may contain `=`.
    pub fn from_pairs<I, S>(entries: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut env = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            match entry.split_once(ENV_DELIMITER) {
                Some((key, value)) if !key.is_empty() => env.insert(key, value),
                _ => return Err(ModelError::InvalidEnv(entry.to_string())),
            }
        }
        Ok(env)
    }

    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
