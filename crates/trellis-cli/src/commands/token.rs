//! Join-token command - print a fresh worker join command

use clap::Args;
use trellis_bootstrap::request_join_token;

use super::PlanArgs;
use crate::Result;

/// Join-token command arguments
#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
}

/// Run the join-token command
pub async fn run(args: TokenArgs) -> Result<()> {
    let (plan, ctx) = args.plan.context()?;
    let command = request_join_token(&ctx, &plan.cluster.master).await?;
    println!("{}", command);
    Ok(())
}
