//! Cluster plan files
//!
//! A plan is a YAML document naming the machines, the network, how to reach
//! the machines over SSH, and optional bootstrap settings:
//!
//! ```yaml
//! master:
//!   ip: 10.0.0.1
//!   hostname: master-0
//! workers:
//!   - ip: 10.0.0.2
//!     hostname: worker-0
//!     labels:
//!       zone: a
//! network:
//!   podCidr: 10.244.0.0/16
//!   serviceCidr: 10.96.0.0/12
//!   mode: vxlan
//! ssh:
//!   user: root
//!   identityFile: ~/.ssh/id_ed25519
//! settings:
//!   concurrency: 4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use trellis_bootstrap::ClusterPlan;
use trellis_common::BootstrapSettings;

use crate::ssh::SshConfig;
use crate::{Error, Result};

/// A parsed plan file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFile {
    /// Machines and network
    #[serde(flatten)]
    pub cluster: ClusterPlan,
    /// How to reach the machines
    #[serde(default)]
    pub ssh: SshConfig,
    /// Bootstrap tunables
    #[serde(default)]
    pub settings: BootstrapSettings,
}

impl PlanFile {
    /// Parse and validate plan YAML, applying `TRELLIS_*` environment overrides
    pub fn parse(yaml: &str) -> Result<Self> {
        let plan = Self::parse_unvalidated(yaml)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Like [`PlanFile::parse`] with an explicit environment lookup
    pub fn parse_with_env(yaml: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut plan: PlanFile = serde_yaml::from_str(yaml)?;
        plan.settings.apply_env_from(lookup)?;
        plan.validate()?;
        Ok(plan)
    }

    fn parse_unvalidated(yaml: &str) -> Result<Self> {
        let mut plan: PlanFile = serde_yaml::from_str(yaml)?;
        plan.settings.apply_env()?;
        Ok(plan)
    }

    /// Read and parse a plan file with environment overrides applied
    ///
    /// Nothing is validated yet, so callers can layer their own overrides
    /// on top before calling [`PlanFile::validate`].
    pub fn read(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|source| Error::PlanRead {
            path: path.to_path_buf(),
            source,
        })?;
        let plan = Self::parse_unvalidated(&yaml)?;
        debug!(
            path = %path.display(),
            master = %plan.cluster.master.ip,
            workers = plan.cluster.workers.len(),
            "loaded cluster plan"
        );
        Ok(plan)
    }

    /// Read, parse, and validate a plan file
    pub fn load(path: &Path) -> Result<Self> {
        let plan = Self::read(path)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Validate machines, network, settings, and SSH config
    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        self.settings.validate()?;
        if self.ssh.user.trim().is_empty() {
            return Err(Error::validation("ssh.user must not be empty"));
        }
        if self.ssh.port == 0 {
            return Err(Error::validation("ssh.port must not be 0"));
        }
        Ok(())
    }
}
