//! Node labels and control-plane taint removal
//!
//! All commands run on the master through `kubectl`. Every command is soft:
//! a node that hasn't registered yet fails its own label, nothing else.

use tracing::info;
use trellis_common::shell;

use crate::context::BootstrapContext;
use crate::machine::Machine;
use crate::outcome::{StepOutcome, StepReport};
use crate::pool::run_bounded;

/// Step name recorded for each label
pub const LABEL_STEP: &str = "label";

/// Step name recorded for taint removal
pub const UNTAINT_STEP: &str = "remove-master-taint";

/// `kubectl label` for one label on one node
///
/// The node name and the `key=value` pair are shell-quoted.
pub fn label_command(node: &str, key: &str, value: &str) -> String {
    format!(
        "kubectl label nodes {} {} --overwrite",
        shell::quote(node),
        shell::quote(&format!("{}={}", key, value))
    )
}

/// Pipeline removing `taint` from every node matching `selector`
pub fn untaint_command(selector: &str, taint: &str) -> String {
    format!(
        "kubectl get nodes --selector={} --output=name | xargs -r -I {{}} kubectl taint {{}} {}-",
        selector, taint
    )
}

/// Apply every machine's labels, issuing one command per label on the master
///
/// Machines are labeled in parallel up to the configured concurrency. The
/// report holds one outcome per label, attributed to the labeled machine.
pub async fn apply_labels(ctx: &BootstrapContext, master: &Machine, machines: &[Machine]) -> StepReport {
    let total: usize = machines.iter().map(|m| m.labels.len()).sum();
    info!(machine = %master.ip, nodes = machines.len(), labels = total, "applying node labels");

    let per_machine = run_bounded(machines, ctx.settings.concurrency, |machine| async move {
        let node = machine.node_name();
        let mut outcomes = Vec::with_capacity(machine.labels.len());
        for (key, value) in &machine.labels {
            let result = ctx.run(master, &label_command(&node, key, value)).await;
            outcomes.push(StepOutcome::from_result(
                machine,
                format!("{}:{}", LABEL_STEP, key),
                result,
            ));
        }
        outcomes
    })
    .await;

    per_machine.into_iter().flatten().collect()
}

/// Remove the no-schedule taint from control-plane nodes
pub async fn remove_master_taint(ctx: &BootstrapContext, master: &Machine) -> StepOutcome {
    let command = untaint_command(
        &ctx.settings.control_plane_selector,
        &ctx.settings.control_plane_taint,
    );
    info!(machine = %master.ip, taint = %ctx.settings.control_plane_taint, "removing control-plane taint");
    let result = ctx.run(master, &command).await;
    StepOutcome::from_result(master, UNTAINT_STEP, result)
}
