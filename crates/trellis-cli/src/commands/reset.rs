//! Reset command - return machines to a pre-cluster state

use clap::Args;
use trellis_bootstrap::{ClusterBootstrapper, Machine};

use super::{print_report, PlanArgs};
use crate::Result;

/// Reset command arguments
#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Reset the workers as well as the master
    #[arg(long)]
    pub workers: bool,
}

/// Run the reset command
///
/// Reset failures are soft, so this only fails when the plan can't be loaded.
pub async fn run(args: ResetArgs) -> Result<()> {
    let (plan, ctx) = args.plan.context()?;
    let bootstrapper = ClusterBootstrapper::new(ctx);

    let machines: Vec<Machine> = if args.workers {
        plan.cluster.machines().cloned().collect()
    } else {
        vec![plan.cluster.master.clone()]
    };

    let reports = bootstrapper.reset_machines(&machines).await;
    for (machine, report) in machines.iter().zip(&reports) {
        print_report(&format!("reset {}", machine), report);
    }
    Ok(())
}
