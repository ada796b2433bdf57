//! Bootstrap settings shared by the orchestrator and the CLI
//!
//! Every field has a default, so an empty `settings:` block in a cluster plan
//! (or no block at all) yields a working configuration. Environment overrides
//! are applied on top of whatever the plan file says:
//!
//! - `TRELLIS_CONCURRENCY` - worker pool bound for cross-machine batches
//! - `TRELLIS_COMMAND_TIMEOUT_SECS` - per remote call bound
//! - `TRELLIS_TEMPLATE_DIR` - directory of template overrides

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable overriding [`BootstrapSettings::concurrency`]
pub const CONCURRENCY_ENV: &str = "TRELLIS_CONCURRENCY";
/// Environment variable overriding [`BootstrapSettings::command_timeout_secs`]
pub const COMMAND_TIMEOUT_ENV: &str = "TRELLIS_COMMAND_TIMEOUT_SECS";
/// Environment variable overriding [`BootstrapSettings::template_dir`]
pub const TEMPLATE_DIR_ENV: &str = "TRELLIS_TEMPLATE_DIR";

/// Default worker pool size for batches across machines
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default bound on a single remote call
///
/// `kubeadm init` pulls images on a cold machine, so this is generous.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Tunables for one bootstrap attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BootstrapSettings {
    /// Maximum machines driven at once during reset/join/label batches
    pub concurrency: usize,
    /// Seconds before a single remote call is abandoned
    pub command_timeout_secs: u64,
    /// Kubernetes version passed to kubeadm and the package repository
    pub kubernetes_version: String,
    /// Registry serving control-plane images
    pub image_repository: String,
    /// File in the remote working directory whose presence means tooling is installed
    pub workdir_marker: String,
    /// Remote path the overlay manifest is written to
    pub overlay_manifest_path: String,
    /// Taint removed from control-plane nodes
    pub control_plane_taint: String,
    /// Label selector identifying control-plane nodes
    pub control_plane_selector: String,
    /// Directory of template overrides (`<dir>/init-command`, ...)
    pub template_dir: Option<PathBuf>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            kubernetes_version: "v1.28.2".to_string(),
            image_repository: "registry.k8s.io".to_string(),
            workdir_marker: "init.sh".to_string(),
            overlay_manifest_path: "flannel.yaml".to_string(),
            control_plane_taint: "node-role.kubernetes.io/control-plane:NoSchedule".to_string(),
            control_plane_selector: "node-role.kubernetes.io/control-plane".to_string(),
            template_dir: None,
        }
    }
}

impl BootstrapSettings {
    /// Per-call timeout as a `Duration`
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// `v1.28` from `v1.28.2`, used for the versioned package repository
    pub fn kubernetes_minor(&self) -> String {
        let version = self.kubernetes_version.trim();
        let bare = version.trim_start_matches('v');
        let mut parts = bare.split('.');
        match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => format!("v{}.{}", major, minor),
            _ => format!("v{}", bare),
        }
    }

    /// Reject settings that would hang or do nothing
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::validation("concurrency must be at least 1"));
        }
        if self.command_timeout_secs == 0 {
            return Err(Error::validation("commandTimeoutSecs must be at least 1"));
        }
        if self.kubernetes_version.trim().is_empty() {
            return Err(Error::validation("kubernetesVersion must not be empty"));
        }
        if self.workdir_marker.trim().is_empty() {
            return Err(Error::validation("workdirMarker must not be empty"));
        }
        if self.overlay_manifest_path.trim().is_empty() {
            return Err(Error::validation("overlayManifestPath must not be empty"));
        }
        Ok(())
    }

    /// Apply `TRELLIS_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (process env in production)
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(CONCURRENCY_ENV) {
            self.concurrency = value.trim().parse().map_err(|_| {
                Error::validation(format!("{} must be a positive integer, got {:?}", CONCURRENCY_ENV, value))
            })?;
        }
        if let Some(value) = lookup(COMMAND_TIMEOUT_ENV) {
            self.command_timeout_secs = value.trim().parse().map_err(|_| {
                Error::validation(format!(
                    "{} must be a number of seconds, got {:?}",
                    COMMAND_TIMEOUT_ENV, value
                ))
            })?;
        }
        if let Some(value) = lookup(TEMPLATE_DIR_ENV) {
            if !value.is_empty() {
                self.template_dir = Some(PathBuf::from(value));
            }
        }
        Ok(())
    }
}
