//! Join command extraction, token requests, and worker joins
//!
//! `kubeadm init` prints its join commands as free text. A join block is a
//! line beginning with `kubeadm join` followed by up to two continuation
//! lines. A line only continues the block when the line before it ends with
//! a backslash, so whatever kubeadm (or the transport) prints after the
//! worker join never leaks into it. Blocks never overlap: the lines of one
//! block are consumed before scanning resumes. The first block is the
//! control-plane join, the second the worker join.

use std::fmt;

use tracing::{debug, info};
use trellis_common::{Error, Result, JOIN_DIRECTIVE};

use crate::context::BootstrapContext;
use crate::machine::Machine;
use crate::outcome::StepReport;
use crate::remote::ConsoleOutput;
use crate::reset::reset;

/// Continuation lines that follow the directive line of a join block
const CONTINUATION_LINES: usize = 2;

/// Command printing a fresh worker join command
pub const TOKEN_CREATE_COMMAND: &str = "kubeadm token create --print-join-command";

/// Which kind of node a join command admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinRole {
    /// Joins as an additional control-plane node
    Master,
    /// Joins as a worker
    Worker,
}

impl fmt::Display for JoinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => write!(f, "master-join"),
            Self::Worker => write!(f, "worker-join"),
        }
    }
}

/// A trimmed join command, known to contain the join directive
#[derive(Clone, PartialEq, Eq)]
pub struct JoinCommand {
    role: JoinRole,
    text: String,
}

impl JoinCommand {
    /// Validate and wrap a join command
    pub fn new(role: JoinRole, text: &str) -> Result<Self> {
        let text = text.trim();
        if !text.contains(JOIN_DIRECTIVE) {
            return Err(Error::validation(format!(
                "{} command does not contain {:?}",
                role, JOIN_DIRECTIVE
            )));
        }
        Ok(Self {
            role,
            text: text.to_string(),
        })
    }

    /// Role the command admits
    pub fn role(&self) -> JoinRole {
        self.role
    }

    /// The command as kubeadm printed it (trimmed, possibly multi-line)
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The command on one line, with backslash continuations removed
    pub fn to_shell(&self) -> String {
        self.text
            .lines()
            .map(|line| line.trim().trim_end_matches('\\').trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for JoinCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for JoinCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The token is a credential; keep it out of debug logs
        f.debug_struct("JoinCommand")
            .field("role", &self.role)
            .field("text", &"<redacted>")
            .finish()
    }
}

/// The two join commands recovered from `kubeadm init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCommands {
    /// Control-plane join
    pub master: JoinCommand,
    /// Worker join
    pub worker: JoinCommand,
}

/// Find every join block in `text`, in order, trimmed
///
/// A block ends at the first line without a trailing backslash, after at
/// most two continuation lines, or at the end of the text.
pub fn find_join_blocks(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].trim_start().starts_with(JOIN_DIRECTIVE) {
            i += 1;
            continue;
        }
        let mut end = i + 1;
        while end < lines.len() && end - i <= CONTINUATION_LINES && continues(lines[end - 1]) {
            end += 1;
        }
        let block = lines[i..end].join("\n");
        blocks.push(block.trim().to_string());
        i = end;
    }

    blocks
}

fn continues(line: &str) -> bool {
    line.trim_end().ends_with('\\')
}

/// Recover the master and worker join commands from init output
///
/// Fails with [`Error::InsufficientJoinCommands`] unless two blocks exist;
/// blocks past the second are ignored.
pub fn extract_join_commands(output: &ConsoleOutput) -> Result<JoinCommands> {
    let blocks = find_join_blocks(output.as_str());
    debug!(found = blocks.len(), "scanned init output for join blocks");

    match blocks.as_slice() {
        [master, worker, ..] => Ok(JoinCommands {
            master: JoinCommand::new(JoinRole::Master, master)?,
            worker: JoinCommand::new(JoinRole::Worker, worker)?,
        }),
        _ => Err(Error::InsufficientJoinCommands {
            found: blocks.len(),
        }),
    }
}

/// Ask the master for a fresh worker join command
///
/// Returns the trimmed console text. Output without the join directive is a
/// [`Error::JoinToken`] carrying the raw text.
pub async fn request_join_token(ctx: &BootstrapContext, master: &Machine) -> Result<String> {
    info!(machine = %master.ip, "requesting join token");
    let output = ctx.run(master, TOKEN_CREATE_COMMAND).await?;
    if !output.contains(JOIN_DIRECTIVE) {
        return Err(Error::join_token(output.into_string()));
    }
    Ok(output.as_str().trim().to_string())
}

/// Request a fresh token and wrap it as a worker join command
pub async fn request_worker_join(ctx: &BootstrapContext, master: &Machine) -> Result<JoinCommand> {
    let text = request_join_token(ctx, master).await?;
    JoinCommand::new(JoinRole::Worker, &text)
}

/// Reset a worker, then join it to the cluster
///
/// Reset failures are soft and come back in the report; the join itself is a
/// hard failure.
pub async fn join_worker(
    ctx: &BootstrapContext,
    worker: &Machine,
    join: &JoinCommand,
) -> Result<StepReport> {
    let report = reset(ctx, worker).await;
    info!(machine = %worker.ip, role = %join.role(), "joining node");
    ctx.run(worker, &join.to_shell()).await?;
    info!(machine = %worker.ip, "node joined");
    Ok(report)
}
