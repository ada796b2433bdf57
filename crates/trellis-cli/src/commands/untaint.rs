//! Untaint command - let workloads schedule on control-plane nodes

use clap::Args;
use trellis_bootstrap::remove_master_taint;

use super::{print_outcome, PlanArgs};
use crate::Result;

/// Untaint command arguments
#[derive(Args, Debug)]
pub struct UntaintArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
}

/// Run the untaint command
pub async fn run(args: UntaintArgs) -> Result<()> {
    let (plan, ctx) = args.plan.context()?;
    let outcome = remove_master_taint(&ctx, &plan.cluster.master).await;
    print_outcome(&outcome);
    Ok(())
}
