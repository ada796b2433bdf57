//! Label command - apply the plan's node labels

use clap::Args;
use trellis_bootstrap::{apply_labels, Machine};

use super::{print_report, PlanArgs};
use crate::Result;

/// Label command arguments
#[derive(Args, Debug)]
pub struct LabelArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
}

/// Run the label command
pub async fn run(args: LabelArgs) -> Result<()> {
    let (plan, ctx) = args.plan.context()?;
    let machines: Vec<Machine> = plan.cluster.machines().cloned().collect();
    let report = apply_labels(&ctx, &plan.cluster.master, &machines).await;
    print_report("labels", &report);
    Ok(())
}
