//! The machines and network of one cluster

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use trellis_common::{Error, Result};

use crate::machine::Machine;
use crate::params::{InitParameters, NetMode, NetworkOverlayParameters};

/// Default pod network, matching flannel's stock manifest
pub const DEFAULT_POD_CIDR: &str = "10.244.0.0/16";
/// Default service network, matching kubeadm's default
pub const DEFAULT_SERVICE_CIDR: &str = "10.96.0.0/12";

fn default_pod_cidr() -> String {
    DEFAULT_POD_CIDR.to_string()
}

fn default_service_cidr() -> String {
    DEFAULT_SERVICE_CIDR.to_string()
}

/// Cluster network settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPlan {
    /// Pod network CIDR; must not overlap the service CIDR
    #[serde(default = "default_pod_cidr")]
    pub pod_cidr: String,
    /// Service CIDR
    #[serde(default = "default_service_cidr")]
    pub service_cidr: String,
    /// Overlay backend
    #[serde(default)]
    pub mode: NetMode,
    /// Cloud access key for `ali-vpc`
    #[serde(default)]
    pub access_key: String,
    /// Cloud access secret for `ali-vpc`
    #[serde(default)]
    pub access_secret: String,
}

impl Default for NetworkPlan {
    fn default() -> Self {
        Self {
            pod_cidr: default_pod_cidr(),
            service_cidr: default_service_cidr(),
            mode: NetMode::default(),
            access_key: String::new(),
            access_secret: String::new(),
        }
    }
}

impl fmt::Debug for NetworkPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkPlan")
            .field("pod_cidr", &self.pod_cidr)
            .field("service_cidr", &self.service_cidr)
            .field("mode", &self.mode)
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

/// One master, any number of workers, and the network they share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPlan {
    /// Machine that runs `kubeadm init`
    pub master: Machine,
    /// Machines joined as workers
    #[serde(default)]
    pub workers: Vec<Machine>,
    /// Network settings
    #[serde(default)]
    pub network: NetworkPlan,
}

impl ClusterPlan {
    /// Plan with no workers and the default network
    pub fn new(master: Machine) -> Self {
        Self {
            master,
            workers: Vec::new(),
            network: NetworkPlan::default(),
        }
    }

    /// Add a worker (builder style)
    pub fn with_worker(mut self, worker: Machine) -> Self {
        self.workers.push(worker);
        self
    }

    /// Replace the network settings (builder style)
    pub fn with_network(mut self, network: NetworkPlan) -> Self {
        self.network = network;
        self
    }

    /// Master followed by every worker
    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        std::iter::once(&self.master).chain(self.workers.iter())
    }

    /// Parameters for `kubeadm init` on the master
    pub fn init_parameters(&self) -> InitParameters {
        InitParameters::new(
            &self.master.ip,
            &self.network.pod_cidr,
            &self.network.service_cidr,
        )
    }

    /// Parameters for the overlay manifest
    pub fn overlay_parameters(&self) -> NetworkOverlayParameters {
        NetworkOverlayParameters::new(&self.network.pod_cidr, self.network.mode)
            .with_credentials(&self.network.access_key, &self.network.access_secret)
    }

    /// Reject plans that can't produce a working cluster
    ///
    /// CIDR overlap is not checked.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for machine in self.machines() {
            if machine.ip.trim().is_empty() {
                return Err(Error::validation(format!(
                    "machine {:?} has an empty ip",
                    machine.hostname
                )));
            }
            if machine.hostname.trim().is_empty() {
                return Err(Error::validation(format!(
                    "machine {} has an empty hostname",
                    machine.ip
                )));
            }
            if !seen.insert(machine.ip.as_str()) {
                return Err(Error::validation(format!(
                    "machine ip {} appears more than once",
                    machine.ip
                )));
            }
        }
        if self.network.pod_cidr.trim().is_empty() || self.network.service_cidr.trim().is_empty() {
            return Err(Error::validation("podCidr and serviceCidr must not be empty"));
        }
        self.overlay_parameters().validate()
    }
}
