//! Ephemeral port allocation
//!
//! Ports are taken from a configured half-open range and must not collide
//! with any host port or node port already claimed in the cluster.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ClusterError, Kubectl, PortAllocator};

/// Half-open port range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            min: 20000,
            max: 30000,
        }
    }
}

impl PortRange {
    pub fn is_valid(&self) -> bool {
        self.min > 0 && self.min < self.max
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PortAllocationError {
    #[error("port {0} is already in use")]
    InUse(u16),

    #[error("no free port left in range [{min}, {max})")]
    Exhausted { min: u16, max: u16 },

    #[error("failed to list ports in use: {0}")]
    Cluster(#[from] ClusterError),
}

/// Choose a port that is not in `used`.
///
/// A non-zero `preferred` port is returned as-is when free and rejected when
/// taken; it does not need to lie inside `range`. Otherwise a random free
/// port in `range` is chosen.
pub fn select_port<R: Rng + ?Sized>(
    used: &HashSet<u16>,
    range: PortRange,
    preferred: u16,
    rng: &mut R,
) -> Result<u16, PortAllocationError> {
    if preferred != 0 {
        if used.contains(&preferred) {
            return Err(PortAllocationError::InUse(preferred));
        }
        return Ok(preferred);
    }

    let free: Vec<u16> = (range.min..range.max).filter(|p| !used.contains(p)).collect();
    free.choose(rng)
        .copied()
        .ok_or(PortAllocationError::Exhausted {
            min: range.min,
            max: range.max,
        })
}

/// Allocator that inspects pod host ports and service node ports via kubectl.
#[derive(Debug, Clone)]
pub struct ClusterPortAllocator {
    kubectl: Kubectl,
    range: PortRange,
}

impl ClusterPortAllocator {
    pub fn new(kubectl: Kubectl, range: PortRange) -> Self {
        Self { kubectl, range }
    }

    fn used_ports(&self) -> Result<HashSet<u16>, ClusterError> {
        let host_ports = self.kubectl.run([
            "get",
            "pods",
            "--all-namespaces",
            "-o",
            "jsonpath={.items[*].spec.containers[*].ports[*].hostPort}",
        ])?;
        let node_ports = self.kubectl.run([
            "get",
            "services",
            "--all-namespaces",
            "-o",
            "jsonpath={.items[*].spec.ports[*].nodePort}",
        ])?;

        let mut used = parse_ports(&host_ports)?;
        used.extend(parse_ports(&node_ports)?);
        Ok(used)
    }
}

impl PortAllocator for ClusterPortAllocator {
    fn select_available_port(&self, preferred: u16) -> Result<u16, PortAllocationError> {
        let used = self.used_ports()?;
        let port = select_port(&used, self.range, preferred, &mut rand::thread_rng())?;
        tracing::debug!(port, used = used.len(), "selected port");
        Ok(port)
    }
}

fn parse_ports(output: &str) -> Result<HashSet<u16>, ClusterError> {
    output
        .split_whitespace()
        .map(|token| {
            token.parse::<u16>().map_err(|_| ClusterError::UnexpectedOutput {
                program: "kubectl".to_string(),
                detail: format!("'{}' is not a port", token),
            })
        })
        .collect()
}
