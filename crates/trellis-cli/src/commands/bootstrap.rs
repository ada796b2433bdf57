//! Bootstrap command - full cluster bootstrap from a plan

use std::path::PathBuf;

use clap::Args;
use tracing::info;
use trellis_bootstrap::ClusterBootstrapper;

use super::{print_outcome, print_report, PlanArgs};
use crate::Result;

/// Bootstrap command arguments
#[derive(Args, Debug)]
pub struct BootstrapArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Where to write the admin kubeconfig
    #[arg(long, default_value = "kubeconfig")]
    pub kubeconfig_out: PathBuf,
}

/// Run the bootstrap command
pub async fn run(args: BootstrapArgs) -> Result<()> {
    let (plan, ctx) = args.plan.context()?;
    let bootstrapper = ClusterBootstrapper::new(ctx);

    let outcome = bootstrapper.bootstrap(&plan.cluster).await?;

    std::fs::write(&args.kubeconfig_out, outcome.credentials.as_str())?;
    info!(path = %args.kubeconfig_out.display(), "wrote admin kubeconfig");

    print_report("master reset", &outcome.reset);
    for worker in &outcome.workers {
        match &worker.result {
            Ok(report) => print_report(&format!("worker {}", worker.machine), report),
            Err(e) => println!("worker {}: join failed: {}", worker.machine, e),
        }
    }
    print_report("labels", &outcome.labels);
    println!("taint:");
    print_outcome(&outcome.taint);

    let joined = outcome.workers.len() - outcome.failed_workers().count();
    println!(
        "\ncluster ready: master {}, {}/{} workers joined, {} soft failures",
        plan.cluster.master.ip,
        joined,
        outcome.workers.len(),
        outcome.soft_failures().len()
    );
    println!("kubeconfig written to {}", args.kubeconfig_out.display());
    Ok(())
}
