//! CLI commands

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use trellis_bootstrap::{BootstrapContext, StepOutcome, StepReport, StepStatus};

use crate::plan::PlanFile;
use crate::ssh::OpenSshExecutor;
use crate::Result;

pub mod bootstrap;
pub mod label;
pub mod render;
pub mod reset;
pub mod token;
pub mod untaint;

/// Plan selection and setting overrides shared by every command
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Cluster plan file
    #[arg(long, short = 'p', env = "TRELLIS_PLAN")]
    pub plan: PathBuf,

    /// Maximum machines driven at once (overrides the plan)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Seconds before a single remote command is abandoned (overrides the plan)
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,
}

impl PlanArgs {
    /// Load the plan, apply command-line overrides, then validate
    pub fn load(&self) -> Result<PlanFile> {
        let mut plan = PlanFile::read(&self.plan)?;
        if let Some(concurrency) = self.concurrency {
            plan.settings.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout_secs {
            plan.settings.command_timeout_secs = timeout;
        }
        plan.validate()?;
        Ok(plan)
    }

    /// Load the plan and build an SSH-backed context for it
    pub fn context(&self) -> Result<(PlanFile, Arc<BootstrapContext>)> {
        let plan = self.load()?;
        let executor = Arc::new(OpenSshExecutor::new(plan.ssh.clone()));
        let ctx = BootstrapContext::builder(executor)
            .settings(plan.settings.clone())
            .build()?;
        Ok((plan, Arc::new(ctx)))
    }
}

/// Print one line per outcome and a failure count
pub fn print_report(title: &str, report: &StepReport) {
    println!("{}:", title);
    for outcome in report.outcomes() {
        print_outcome(outcome);
    }
    let failed = report.failures().count();
    if failed > 0 {
        println!("  {} of {} steps failed", failed, report.len());
    }
}

/// Print a single outcome
pub fn print_outcome(outcome: &StepOutcome) {
    let marker = match outcome.status {
        StepStatus::Succeeded => "ok",
        StepStatus::Skipped => "--",
        StepStatus::Failed(_) => "!!",
    };
    println!("  [{}] {}", marker, outcome);
}
