//! Bootstrap state machine
//!
//! One attempt walks the master through
//! `Unreset → Reset → Initialized → TokensExtracted → OverlayInstalled →
//! CredentialsRetrieved → WorkersJoined → Labeled → TaintRemoved`.
//! There is no rollback: a hard failure leaves the machines wherever the last
//! successful phase put them, and the [`BootstrapFailure`] names that phase.
//! A new attempt starts with reset, which is safe from any state.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use trellis_common::Error;

use crate::context::BootstrapContext;
use crate::credentials::{retrieve_credentials, CredentialBundle};
use crate::init::run_init;
use crate::join::{extract_join_commands, join_worker, JoinCommand, JoinCommands};
use crate::labels::{apply_labels, remove_master_taint};
use crate::machine::Machine;
use crate::outcome::{StepOutcome, StepReport};
use crate::overlay::install_overlay;
use crate::plan::ClusterPlan;
use crate::pool::run_bounded;
use crate::reset::reset;

/// Phases of one bootstrap attempt, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootstrapPhase {
    /// Nothing has run yet
    Unreset,
    /// Master reset finished (soft failures allowed)
    Reset,
    /// `kubeadm init` succeeded
    Initialized,
    /// Both join commands recovered
    TokensExtracted,
    /// Overlay manifest applied
    OverlayInstalled,
    /// Admin kubeconfig retrieved and validated
    CredentialsRetrieved,
    /// Every worker attempted its join
    WorkersJoined,
    /// Labels applied (soft failures allowed)
    Labeled,
    /// Control-plane taint removal attempted
    TaintRemoved,
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unreset => "Unreset",
            Self::Reset => "Reset",
            Self::Initialized => "Initialized",
            Self::TokensExtracted => "TokensExtracted",
            Self::OverlayInstalled => "OverlayInstalled",
            Self::CredentialsRetrieved => "CredentialsRetrieved",
            Self::WorkersJoined => "WorkersJoined",
            Self::Labeled => "Labeled",
            Self::TaintRemoved => "TaintRemoved",
        };
        f.write_str(name)
    }
}

/// A hard failure, with the last phase the attempt reached
#[derive(Debug, Error)]
#[error("bootstrap stopped after {phase}: {error}")]
pub struct BootstrapFailure {
    /// Last phase reached successfully
    pub phase: BootstrapPhase,
    /// What went wrong in the phase after it
    #[source]
    pub error: Error,
}

/// How one worker's join ended
#[derive(Debug)]
pub struct WorkerJoin {
    /// The worker
    pub machine: Machine,
    /// Reset report on success, the join failure otherwise
    pub result: Result<StepReport, Error>,
}

impl WorkerJoin {
    /// Whether the worker joined
    pub fn joined(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a successful attempt produced
#[derive(Debug)]
pub struct BootstrapOutcome {
    /// Phase reached (always `TaintRemoved` on success)
    pub phase: BootstrapPhase,
    /// Join commands recovered from init
    pub joins: JoinCommands,
    /// Admin kubeconfig
    pub credentials: CredentialBundle,
    /// Master reset steps
    pub reset: StepReport,
    /// Per-worker join results
    pub workers: Vec<WorkerJoin>,
    /// Label steps
    pub labels: StepReport,
    /// Taint removal step
    pub taint: StepOutcome,
}

impl BootstrapOutcome {
    /// Workers whose join failed
    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerJoin> {
        self.workers.iter().filter(|w| !w.joined())
    }

    /// Every soft-failure outcome across reset, worker resets, labels, and taint
    pub fn soft_failures(&self) -> Vec<&StepOutcome> {
        let worker_resets = self
            .workers
            .iter()
            .filter_map(|w| w.result.as_ref().ok())
            .flat_map(|report| report.failures());
        self.reset
            .failures()
            .chain(worker_resets)
            .chain(self.labels.failures())
            .chain(std::iter::once(&self.taint).filter(|t| t.is_failure()))
            .collect()
    }
}

/// Drives bootstrap attempts against one context
#[derive(Clone)]
pub struct ClusterBootstrapper {
    ctx: Arc<BootstrapContext>,
}

impl ClusterBootstrapper {
    /// Create a bootstrapper over a context
    pub fn new(ctx: Arc<BootstrapContext>) -> Self {
        Self { ctx }
    }

    /// The shared context
    pub fn context(&self) -> &BootstrapContext {
        &self.ctx
    }

    /// Reset machines in parallel, one report per machine in input order
    pub async fn reset_machines(&self, machines: &[Machine]) -> Vec<StepReport> {
        let ctx = self.ctx.as_ref();
        run_bounded(machines, ctx.settings.concurrency, |machine| reset(ctx, machine)).await
    }

    /// Reset and join workers in parallel
    ///
    /// One worker failing never stops the others.
    pub async fn join_workers(&self, workers: &[Machine], join: &JoinCommand) -> Vec<WorkerJoin> {
        let ctx = self.ctx.as_ref();
        run_bounded(workers, ctx.settings.concurrency, |machine| async move {
            let result = join_worker(ctx, machine, join).await;
            if let Err(e) = &result {
                warn!(machine = %machine.ip, error = %e, "worker join failed");
            }
            WorkerJoin {
                machine: machine.clone(),
                result,
            }
        })
        .await
    }

    /// Run a full bootstrap attempt
    pub async fn bootstrap(&self, plan: &ClusterPlan) -> Result<BootstrapOutcome, BootstrapFailure> {
        let ctx = self.ctx.as_ref();
        let master = &plan.master;
        let mut phase = BootstrapPhase::Unreset;
        let fail = |phase: BootstrapPhase| move |error: Error| BootstrapFailure { phase, error };

        plan.validate().map_err(fail(phase))?;
        info!(
            master = %master.ip,
            workers = plan.workers.len(),
            pod_cidr = %plan.network.pod_cidr,
            service_cidr = %plan.network.service_cidr,
            "starting cluster bootstrap"
        );

        let reset_report = reset(ctx, master).await;
        phase = advance(phase, BootstrapPhase::Reset);

        let output = run_init(ctx, master, &plan.init_parameters())
            .await
            .map_err(fail(phase))?;
        phase = advance(phase, BootstrapPhase::Initialized);

        let joins = extract_join_commands(&output).map_err(fail(phase))?;
        phase = advance(phase, BootstrapPhase::TokensExtracted);

        install_overlay(ctx, master, &plan.overlay_parameters())
            .await
            .map_err(fail(phase))?;
        phase = advance(phase, BootstrapPhase::OverlayInstalled);

        let credentials = retrieve_credentials(ctx, master).await.map_err(fail(phase))?;
        phase = advance(phase, BootstrapPhase::CredentialsRetrieved);

        let workers = self.join_workers(&plan.workers, &joins.worker).await;
        phase = advance(phase, BootstrapPhase::WorkersJoined);

        let labeled: Vec<Machine> = std::iter::once(master.clone())
            .chain(workers.iter().filter(|w| w.joined()).map(|w| w.machine.clone()))
            .collect();
        let labels = apply_labels(ctx, master, &labeled).await;
        phase = advance(phase, BootstrapPhase::Labeled);

        let taint = remove_master_taint(ctx, master).await;
        phase = advance(phase, BootstrapPhase::TaintRemoved);

        let outcome = BootstrapOutcome {
            phase,
            joins,
            credentials,
            reset: reset_report,
            workers,
            labels,
            taint,
        };
        info!(
            master = %master.ip,
            failed_workers = outcome.failed_workers().count(),
            soft_failures = outcome.soft_failures().len(),
            "cluster bootstrap finished"
        );
        Ok(outcome)
    }
}

fn advance(from: BootstrapPhase, to: BootstrapPhase) -> BootstrapPhase {
    info!(from = %from, to = %to, "bootstrap phase reached");
    to
}
