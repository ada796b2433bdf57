//! Per-step outcomes for soft-failure steps
//!
//! Reset, labeling, and taint removal keep going when an individual command
//! fails. Those failures are collected here so the caller can see exactly
//! which step failed on which machine.

use std::fmt;

use tracing::warn;
use trellis_common::Error;

use crate::machine::Machine;

/// How a single step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The command ran and exited zero
    Succeeded,
    /// The step was not needed
    Skipped,
    /// The command failed; the error text is kept verbatim
    Failed(String),
}

/// One step on one machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Address of the machine the step ran on
    pub machine: String,
    /// Step name (`kubeadm-reset`, `label`, ...)
    pub step: String,
    /// How it ended
    pub status: StepStatus,
}

impl StepOutcome {
    /// A successful step
    pub fn succeeded(machine: &Machine, step: impl Into<String>) -> Self {
        Self {
            machine: machine.ip.clone(),
            step: step.into(),
            status: StepStatus::Succeeded,
        }
    }

    /// A step that was not needed
    pub fn skipped(machine: &Machine, step: impl Into<String>) -> Self {
        Self {
            machine: machine.ip.clone(),
            step: step.into(),
            status: StepStatus::Skipped,
        }
    }

    /// A failed step
    pub fn failed(machine: &Machine, step: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            machine: machine.ip.clone(),
            step: step.into(),
            status: StepStatus::Failed(error.to_string()),
        }
    }

    /// Build an outcome from a result, logging failures
    pub fn from_result<T>(machine: &Machine, step: impl Into<String>, result: Result<T, Error>) -> Self {
        let step = step.into();
        match result {
            Ok(_) => Self::succeeded(machine, step),
            Err(e) => {
                warn!(machine = %machine.ip, step = %step, error = %e, "step failed, continuing");
                Self::failed(machine, step, e)
            }
        }
    }

    /// Whether the step failed
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            StepStatus::Succeeded => write!(f, "{} {}: ok", self.machine, self.step),
            StepStatus::Skipped => write!(f, "{} {}: skipped", self.machine, self.step),
            StepStatus::Failed(e) => write!(f, "{} {}: failed: {}", self.machine, self.step, e),
        }
    }
}

/// Ordered outcomes of a batch of soft-failure steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    outcomes: Vec<StepOutcome>,
}

impl StepReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome
    pub fn push(&mut self, outcome: StepOutcome) {
        self.outcomes.push(outcome);
    }

    /// Append a result as an outcome (see [`StepOutcome::from_result`])
    pub fn record<T>(&mut self, machine: &Machine, step: impl Into<String>, result: Result<T, Error>) {
        self.push(StepOutcome::from_result(machine, step, result));
    }

    /// Append every outcome of another report
    pub fn merge(&mut self, other: StepReport) {
        self.outcomes.extend(other.outcomes);
    }

    /// All outcomes in the order they were recorded
    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// Only the failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Whether every step succeeded or was skipped
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Outcome of a named step on a machine
    pub fn find(&self, machine: &str, step: &str) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.machine == machine && o.step == step)
    }

    /// Number of outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the report is empty
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl FromIterator<StepOutcome> for StepReport {
    fn from_iter<I: IntoIterator<Item = StepOutcome>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}
