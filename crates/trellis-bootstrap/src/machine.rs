//! Machines the orchestrator drives
//!
//! A machine is created by whatever provisioned it; trellis only reads its
//! address, hostname, and labels. Everything that changes on a machine
//! changes through remote commands, never through this struct.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A provisioned machine reachable through the Remote Execution Port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Address commands are sent to; also the API server advertise address for a master
    pub ip: String,
    /// Hostname as reported by the provider (may carry a domain or mixed case)
    pub hostname: String,
    /// Node labels applied once the machine has joined
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Machine {
    /// Create a machine with no labels
    pub fn new(ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            hostname: hostname.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Add a label (builder style)
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Node name the cluster registers this machine under
    pub fn node_name(&self) -> String {
        canonicalize_hostname(&self.hostname)
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hostname, self.ip)
    }
}

/// Convert a provider hostname into the node name kubelet registers
///
/// Kubelet lower-cases the short hostname, and node names can't carry `_`.
pub fn canonicalize_hostname(hostname: &str) -> String {
    let short = hostname
        .trim()
        .split('.')
        .next()
        .unwrap_or_default();
    short.to_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_hostname_strips_domain_and_case() {
        assert_eq!(canonicalize_hostname("Worker-01.cn-hangzhou.internal"), "worker-01");
        assert_eq!(canonicalize_hostname("  MASTER  "), "master");
        assert_eq!(canonicalize_hostname("gpu_node_3"), "gpu-node-3");
        assert_eq!(canonicalize_hostname("w1"), "w1");
    }

    #[test]
    fn machine_node_name_uses_canonical_hostname() {
        let machine = Machine::new("10.0.0.2", "iZbp1abc.example.com");
        assert_eq!(machine.node_name(), "izbp1abc");
    }

    #[test]
    fn labels_are_unique_per_key() {
        let machine = Machine::new("10.0.0.2", "w1")
            .with_label("zone", "a")
            .with_label("zone", "b");
        assert_eq!(machine.labels.len(), 1);
        assert_eq!(machine.labels.get("zone").map(String::as_str), Some("b"));
    }

    #[test]
    fn labels_default_to_empty_when_deserializing() {
        let machine: Machine =
            serde_json::from_str(r#"{"ip": "10.0.0.3", "hostname": "w2"}"#).expect("parses");
        assert!(machine.labels.is_empty());
    }
}
