//! Remote Execution Port
//!
//! Everything trellis does to a machine goes through [`RemoteExecutor`]: run a
//! shell command and get its console output back, or drop a file into the
//! machine's working directory. The transport behind it (SSH, an agent, a
//! test fake) is the caller's choice.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};
use trellis_common::TransportError;

use crate::machine::Machine;

/// Combined stdout/stderr text returned by a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleOutput(String);

impl ConsoleOutput {
    /// Wrap captured text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the text
    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether the output contains `needle` anywhere
    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }

    /// Iterate the output line by line
    pub fn lines(&self) -> std::str::Lines<'_> {
        self.0.lines()
    }
}

impl From<String> for ConsoleOutput {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for ConsoleOutput {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl fmt::Display for ConsoleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport that runs commands on a machine
///
/// Implementations must be safe to call concurrently for different machines;
/// trellis never issues two calls to the same machine at once.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a shell command and return its console output
    ///
    /// A non-zero exit must be reported as an error whose text includes the
    /// remote stderr.
    async fn run(&self, machine: &Machine, command: &str) -> Result<ConsoleOutput, TransportError>;

    /// Write `contents` to `path` (relative paths resolve against the working directory)
    async fn write_artifact(
        &self,
        machine: &Machine,
        path: &str,
        contents: &str,
    ) -> Result<(), TransportError>;
}

/// Executor wrapper that bounds every call with a timeout
///
/// A hung remote call would otherwise stall a whole bootstrap attempt.
pub struct BoundedExecutor {
    inner: Arc<dyn RemoteExecutor>,
    timeout: Duration,
}

impl BoundedExecutor {
    /// Wrap `inner`, abandoning any call that outlives `timeout`
    pub fn new(inner: Arc<dyn RemoteExecutor>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The per-call bound
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl RemoteExecutor for BoundedExecutor {
    async fn run(&self, machine: &Machine, command: &str) -> Result<ConsoleOutput, TransportError> {
        debug!(machine = %machine.ip, command, "running remote command");
        match tokio::time::timeout(self.timeout, self.inner.run(machine, command)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(machine = %machine.ip, command, timeout = ?self.timeout, "remote command timed out");
                Err(TransportError::Timeout(self.timeout))
            }
        }
    }

    async fn write_artifact(
        &self,
        machine: &Machine,
        path: &str,
        contents: &str,
    ) -> Result<(), TransportError> {
        debug!(machine = %machine.ip, path, bytes = contents.len(), "writing remote artifact");
        match tokio::time::timeout(self.timeout, self.inner.write_artifact(machine, path, contents))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(machine = %machine.ip, path, timeout = ?self.timeout, "artifact write timed out");
                Err(TransportError::Timeout(self.timeout))
            }
        }
    }
}
