//! Data volumes
//!
//! Training data is mounted from persistent volume claims. Their description
//! and owner come from the `description` and `owner` annotations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ClusterError, Kubectl, VolumeLister};

/// A persistent volume claim jobs can mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataVolume {
    pub name: String,
    pub access_modes: Vec<String>,
    pub description: String,
    pub owner: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ClaimList {
    #[serde(default)]
    items: Vec<Claim>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claim {
    metadata: ClaimMetadata,
    #[serde(default)]
    spec: ClaimSpec,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimMetadata {
    name: String,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ClaimSpec {
    #[serde(default)]
    access_modes: Vec<String>,
}

/// Parse `kubectl get pvc -o json` output.
pub(crate) fn parse_volumes(output: &str) -> Result<Vec<DataVolume>, ClusterError> {
    let list: ClaimList = serde_json::from_str(output)?;
    let mut volumes: Vec<DataVolume> = list
        .items
        .into_iter()
        .map(|claim| {
            let mut annotations = claim.metadata.annotations;
            DataVolume {
                name: claim.metadata.name,
                access_modes: claim.spec.access_modes,
                description: annotations.remove("description").unwrap_or_default(),
                owner: annotations.remove("owner").unwrap_or_default(),
                created_at: claim.metadata.creation_timestamp,
            }
        })
        .collect();
    volumes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(volumes)
}

impl VolumeLister for Kubectl {
    fn list_volumes(&self, namespace: &str) -> Result<Vec<DataVolume>, ClusterError> {
        let out = self.run(["get", "pvc", "--namespace", namespace, "-o", "json"])?;
        parse_volumes(&out)
    }
}
