//! Error types for trellis
//!
//! Errors are split along the hard-failure classes of a bootstrap attempt:
//! template rendering, transport failures against a specific machine, and
//! validation of the semi-structured text a machine sends back. Soft failures
//! (reset and label steps) never surface here; they are reported as step
//! outcomes instead.

use std::time::Duration;

use thiserror::Error;

use crate::template::TemplateError;

/// Failure reported by a Remote Execution Port implementation
///
/// The text of these errors is surfaced verbatim to callers, so implementations
/// should put the remote stderr (or the connection failure) in the message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The session could not be opened
    #[error("connection failed: {0}")]
    Connect(String),

    /// The remote command ran and exited non-zero
    #[error("command exited with status {status}: {stderr}")]
    NonZeroExit {
        /// Exit status reported by the remote shell
        status: i32,
        /// Captured stderr (or stdout when stderr is empty)
        stderr: String,
    },

    /// The call did not complete within the configured bound
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// Local I/O error while driving the session
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else the transport wants to report
    #[error("{0}")]
    Other(String),
}

/// Main error type for trellis operations
#[derive(Debug, Error)]
pub enum Error {
    /// A named template failed to render
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The Remote Execution Port failed on a required step
    #[error("transport error on {machine}: {source}")]
    Transport {
        /// Address of the machine the command was sent to
        machine: String,
        /// The underlying transport failure
        source: TransportError,
    },

    /// Master init output did not contain both join blocks
    #[error("expected 2 join commands in init output, found {found}")]
    InsufficientJoinCommands {
        /// Number of well-formed join blocks that were found
        found: usize,
    },

    /// The admin credential bundle is missing a required marker
    #[error("credential bundle is malformed: missing {missing}")]
    InvalidCredentialFormat {
        /// The marker that was not present
        missing: &'static str,
    },

    /// Token creation did not print a join command
    #[error("join token request returned unexpected output: {output}")]
    JoinToken {
        /// Raw console output, kept for diagnostics
        output: String,
    },

    /// Invalid input supplied by the caller
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
    },
}

impl Error {
    /// Create a transport error bound to a machine address
    pub fn transport(machine: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            machine: machine.into(),
            source,
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a join token error carrying the raw output
    pub fn join_token(output: impl Into<String>) -> Self {
        Self::JoinToken {
            output: output.into(),
        }
    }

    /// Whether the failure came from the transport rather than the content
    ///
    /// Callers use this to decide whether re-running the attempt (starting
    /// with a reset) is worthwhile.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
