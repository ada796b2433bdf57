//! OpenSSH-backed Remote Execution Port
//!
//! Shells out to the system `ssh` client in batch mode, so host keys, agents,
//! and `~/.ssh/config` behave exactly as they do for the operator.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};
use trellis_bootstrap::{ConsoleOutput, Machine, RemoteExecutor};
use trellis_common::{shell, TransportError};

/// ssh exits with 255 when the connection itself fails
const SSH_CONNECTION_FAILURE: i32 = 255;

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

/// How to reach machines over SSH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfig {
    /// Remote user
    #[serde(default = "default_user")]
    pub user: String,
    /// Remote port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Private key passed with `-i`
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    /// Extra `-o` options (`ConnectTimeout=10`, ...)
    #[serde(default)]
    pub options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_user(),
            port: default_port(),
            identity_file: None,
            options: Vec::new(),
        }
    }
}

/// Runs commands through the `ssh` binary
#[derive(Debug, Clone)]
pub struct OpenSshExecutor {
    config: SshConfig,
}

impl OpenSshExecutor {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Arguments up to and including the destination
    pub fn ssh_args(&self, machine: &Machine) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-p".to_string(),
            self.config.port.to_string(),
        ];
        if let Some(identity) = &self.config.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        for option in &self.config.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push(format!("{}@{}", self.config.user, machine.ip));
        args
    }

    async fn execute(
        &self,
        machine: &Machine,
        command: &str,
        stdin: Option<&str>,
    ) -> Result<ConsoleOutput, TransportError> {
        trace!(machine = %machine.ip, command, "ssh");
        let mut child = Command::new("ssh")
            .args(self.ssh_args(machine))
            .arg(command)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(contents), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(contents.as_bytes()).await?;
            // Close stdin so the remote `cat` sees EOF
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            return Ok(success_output(machine, &stdout, &stderr));
        }

        let status = output.status.code().unwrap_or(-1);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        if status == SSH_CONNECTION_FAILURE {
            return Err(TransportError::Connect(detail.trim().to_string()));
        }
        Err(TransportError::NonZeroExit {
            status,
            stderr: detail.trim().to_string(),
        })
    }
}

#[async_trait]
impl RemoteExecutor for OpenSshExecutor {
    async fn run(&self, machine: &Machine, command: &str) -> Result<ConsoleOutput, TransportError> {
        self.execute(machine, command, None).await
    }

    async fn write_artifact(
        &self,
        machine: &Machine,
        path: &str,
        contents: &str,
    ) -> Result<(), TransportError> {
        self.execute(machine, &format!("cat > {}", shell::quote(path)), Some(contents))
            .await
            .map(|_| ())
    }
}

/// Console output of a successful command
///
/// Only stdout is parsed downstream; stderr (kubeadm preflight warnings,
/// ssh banners) is logged and dropped.
fn success_output(machine: &Machine, stdout: &str, stderr: &str) -> ConsoleOutput {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        debug!(machine = %machine.ip, stderr, "remote command wrote to stderr");
    }
    ConsoleOutput::from(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_include_port_identity_and_options() {
        let executor = OpenSshExecutor::new(SshConfig {
            user: "ubuntu".to_string(),
            port: 2222,
            identity_file: Some(PathBuf::from("/keys/id")),
            options: vec!["ConnectTimeout=10".to_string()],
        });
        let args = executor.ssh_args(&Machine::new("10.0.0.2", "w1"));
        assert_eq!(
            args,
            [
                "-o",
                "BatchMode=yes",
                "-p",
                "2222",
                "-i",
                "/keys/id",
                "-o",
                "ConnectTimeout=10",
                "ubuntu@10.0.0.2"
            ]
        );
    }

    #[test]
    fn default_config_targets_root_on_22() {
        let executor = OpenSshExecutor::new(SshConfig::default());
        let args = executor.ssh_args(&Machine::new("10.0.0.1", "m"));
        assert_eq!(args.last().map(String::as_str), Some("root@10.0.0.1"));
        assert!(args.windows(2).any(|w| w == ["-p", "22"]));
        assert!(!args.contains(&"-i".to_string()));
    }

    #[test]
    fn success_output_keeps_stdout_only() {
        let stdout = "kubeadm join 10.0.0.1:6443 --token t \\\n\t--discovery-token-ca-cert-hash sha256:h \n";
        let output = success_output(
            &Machine::new("10.0.0.1", "master"),
            stdout,
            "W1016 12:00:00.000000    1234 checks.go:835] detected that the sandbox image is inconsistent\n",
        );
        assert_eq!(output.as_str(), stdout);
        assert!(!output.contains("checks.go"));
    }
}
