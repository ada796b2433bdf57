//! Node reset
//!
//! Brings a machine back to a pre-cluster state so init or join can run on
//! it. Every step is soft: a failure is recorded and the next step still runs,
//! because a partially-initialized node is exactly the case reset exists for.
//! All commands are safe to repeat.

use std::fmt;

use tracing::{debug, info};
use trellis_common::template::TemplateKind;
use trellis_common::Result;

use crate::context::BootstrapContext;
use crate::machine::Machine;
use crate::outcome::{StepOutcome, StepReport};
use crate::params::BootstrapScriptFields;

/// Command listing the remote working directory, one entry per line
pub const LIST_WORKDIR_COMMAND: &str = "ls -1A";

/// Steps of a reset, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetStep {
    /// List the working directory to look for the tooling marker
    InspectWorkdir,
    /// Write and run the tooling install script (skipped when the marker exists)
    InstallTooling,
    /// `kubeadm reset` with auto-confirmation
    KubeadmReset,
    /// Remove the user kubeconfig directory
    RemoveKubeconfig,
    /// Remove a previously written overlay manifest
    RemoveOverlayManifest,
    /// Bring down and delete the `cni0` bridge
    TeardownCni0,
    /// Bring down and delete the `flannel.1` interface
    TeardownFlannel,
    /// Remove CNI state and configuration
    PurgeCniState,
    /// Stop kubelet
    StopKubelet,
}

impl ResetStep {
    /// Steps that run unconditionally after tooling is ensured
    pub const CLEANUP: [ResetStep; 7] = [
        ResetStep::KubeadmReset,
        ResetStep::RemoveKubeconfig,
        ResetStep::RemoveOverlayManifest,
        ResetStep::TeardownCni0,
        ResetStep::TeardownFlannel,
        ResetStep::PurgeCniState,
        ResetStep::StopKubelet,
    ];

    /// Step name used in outcomes and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::InspectWorkdir => "inspect-workdir",
            Self::InstallTooling => "install-tooling",
            Self::KubeadmReset => "kubeadm-reset",
            Self::RemoveKubeconfig => "remove-kubeconfig",
            Self::RemoveOverlayManifest => "remove-overlay-manifest",
            Self::TeardownCni0 => "teardown-cni0",
            Self::TeardownFlannel => "teardown-flannel",
            Self::PurgeCniState => "purge-cni-state",
            Self::StopKubelet => "stop-kubelet",
        }
    }

    /// Shell command for a cleanup step
    ///
    /// Returns `None` for the two tooling steps, which aren't a single command.
    pub fn command(&self, overlay_manifest_path: &str) -> Option<String> {
        let cmd = match self {
            Self::InspectWorkdir => LIST_WORKDIR_COMMAND.to_string(),
            Self::InstallTooling => return None,
            Self::KubeadmReset => "echo y | kubeadm reset".to_string(),
            Self::RemoveKubeconfig => "rm -rf $HOME/.kube".to_string(),
            Self::RemoveOverlayManifest => format!("rm -f {}", overlay_manifest_path),
            Self::TeardownCni0 => remove_link("cni0"),
            Self::TeardownFlannel => remove_link("flannel.1"),
            Self::PurgeCniState => "rm -rf /var/lib/cni/ && rm -rf /etc/cni/net.d/*".to_string(),
            Self::StopKubelet => "systemctl stop kubelet".to_string(),
        };
        Some(cmd)
    }
}

impl fmt::Display for ResetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Only touches the interface when it exists, so a second reset is quiet
fn remove_link(name: &str) -> String {
    format!(
        "if ip link show {0} >/dev/null 2>&1; then ip link set {0} down && ip link delete {0}; fi",
        name
    )
}

/// Reset a machine, returning the outcome of every step
///
/// Never fails: every failure is in the report.
pub async fn reset(ctx: &BootstrapContext, machine: &Machine) -> StepReport {
    info!(machine = %machine.ip, "resetting node");
    let mut report = StepReport::new();

    ensure_tooling(ctx, machine, &mut report).await;

    for step in ResetStep::CLEANUP {
        let Some(command) = step.command(&ctx.settings.overlay_manifest_path) else {
            continue;
        };
        let result = ctx.run(machine, &command).await;
        report.record(machine, step.name(), result);
    }

    let failed = report.failures().count();
    info!(machine = %machine.ip, failed, "node reset finished");
    report
}

/// Install tooling unless the working directory already has the marker file
async fn ensure_tooling(ctx: &BootstrapContext, machine: &Machine, report: &mut StepReport) {
    let marker = ctx.settings.workdir_marker.as_str();

    let listing = match ctx.run(machine, LIST_WORKDIR_COMMAND).await {
        Ok(listing) => listing,
        Err(e) => {
            // Can't tell whether tooling is present; don't reinstall blind
            report.record::<()>(machine, ResetStep::InspectWorkdir.name(), Err(e));
            report.push(StepOutcome::skipped(machine, ResetStep::InstallTooling.name()));
            return;
        }
    };
    report.push(StepOutcome::succeeded(machine, ResetStep::InspectWorkdir.name()));

    if listing.lines().any(|entry| entry.trim() == marker) {
        debug!(machine = %machine.ip, marker, "tooling marker present, skipping install");
        report.push(StepOutcome::skipped(machine, ResetStep::InstallTooling.name()));
        return;
    }

    let result = install_tooling(ctx, machine, marker).await;
    report.record(machine, ResetStep::InstallTooling.name(), result);
}

/// Render the tooling install script written on first reset
pub fn render_bootstrap_script(ctx: &BootstrapContext) -> Result<String> {
    let fields = BootstrapScriptFields::new(&ctx.settings);
    Ok(ctx.renderer.render(TemplateKind::BootstrapScript, &fields)?)
}

async fn install_tooling(ctx: &BootstrapContext, machine: &Machine, marker: &str) -> Result<()> {
    info!(machine = %machine.ip, "installing node tooling");
    let script = render_bootstrap_script(ctx)?;
    ctx.write_artifact(machine, marker, &script).await?;
    ctx.run(machine, &format!("sh {}", marker)).await?;
    Ok(())
}
