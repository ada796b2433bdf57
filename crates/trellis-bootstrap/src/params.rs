//! Parameter records rendered into templates
//!
//! Records are immutable and built once per bootstrap attempt. Pod and
//! service CIDRs must not overlap; that is the caller's responsibility and is
//! not checked here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trellis_common::{BootstrapSettings, Error};

/// Inputs to the master `kubeadm init` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitParameters {
    /// API server advertise address
    #[serde(rename = "ip")]
    pub master_ip: String,
    /// Pod network CIDR
    pub pod_cidr: String,
    /// Service CIDR
    pub service_cidr: String,
}

impl InitParameters {
    /// Build init parameters for a master address
    pub fn new(
        master_ip: impl Into<String>,
        pod_cidr: impl Into<String>,
        service_cidr: impl Into<String>,
    ) -> Self {
        Self {
            master_ip: master_ip.into(),
            pod_cidr: pod_cidr.into(),
            service_cidr: service_cidr.into(),
        }
    }
}

/// Fields of the `init-command` template
#[derive(Debug, Serialize)]
pub(crate) struct InitCommandFields<'a> {
    #[serde(flatten)]
    pub params: &'a InitParameters,
    pub kubernetes_version: &'a str,
    pub image_repository: &'a str,
}

impl<'a> InitCommandFields<'a> {
    pub fn new(params: &'a InitParameters, settings: &'a BootstrapSettings) -> Self {
        Self {
            params,
            kubernetes_version: &settings.kubernetes_version,
            image_repository: &settings.image_repository,
        }
    }
}

/// Fields of the `bootstrap-script` template
#[derive(Debug, Serialize)]
pub(crate) struct BootstrapScriptFields<'a> {
    pub kubernetes_version: &'a str,
    pub kubernetes_minor: String,
    pub image_repository: &'a str,
}

impl<'a> BootstrapScriptFields<'a> {
    pub fn new(settings: &'a BootstrapSettings) -> Self {
        Self {
            kubernetes_version: &settings.kubernetes_version,
            kubernetes_minor: settings.kubernetes_minor(),
            image_repository: &settings.image_repository,
        }
    }
}

/// Flannel backend used by the overlay network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetMode {
    /// VXLAN encapsulation; works on any L3 network
    #[default]
    Vxlan,
    /// Direct routes between hosts; requires L2 adjacency
    HostGw,
    /// Alibaba Cloud VPC route tables; needs an access key pair
    AliVpc,
}

impl NetMode {
    /// Backend name as flannel spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vxlan => "vxlan",
            Self::HostGw => "host-gw",
            Self::AliVpc => "ali-vpc",
        }
    }

    /// Whether the backend calls a cloud API and needs credentials
    pub fn requires_credentials(&self) -> bool {
        matches!(self, Self::AliVpc)
    }
}

impl fmt::Display for NetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vxlan" => Ok(Self::Vxlan),
            "host-gw" | "hostgw" => Ok(Self::HostGw),
            "ali-vpc" | "alivpc" => Ok(Self::AliVpc),
            other => Err(Error::validation(format!("unknown network mode: {}", other))),
        }
    }
}

/// Inputs to the `overlay-manifest` template
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct NetworkOverlayParameters {
    /// Pod network CIDR; must match the one given to `kubeadm init`
    pub pod_cidr: String,
    /// Cloud access key (empty unless the backend needs it)
    pub access_key: String,
    /// Cloud access secret (empty unless the backend needs it)
    pub access_secret: String,
    /// Flannel backend
    pub net_mode: NetMode,
}

impl NetworkOverlayParameters {
    /// Overlay parameters for a backend that needs no credentials
    pub fn new(pod_cidr: impl Into<String>, net_mode: NetMode) -> Self {
        Self {
            pod_cidr: pod_cidr.into(),
            access_key: String::new(),
            access_secret: String::new(),
            net_mode,
        }
    }

    /// Attach cloud credentials
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        self.access_key = access_key.into();
        self.access_secret = access_secret.into();
        self
    }

    /// Reject a credentialed backend without credentials
    pub fn validate(&self) -> Result<(), Error> {
        if self.net_mode.requires_credentials()
            && (self.access_key.is_empty() || self.access_secret.is_empty())
        {
            return Err(Error::validation(format!(
                "network mode {} requires an access key and secret",
                self.net_mode
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for NetworkOverlayParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't expose the secret in debug output
        f.debug_struct("NetworkOverlayParameters")
            .field("pod_cidr", &self.pod_cidr)
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .field("net_mode", &self.net_mode)
            .finish()
    }
}
