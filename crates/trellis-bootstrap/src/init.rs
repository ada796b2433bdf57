//! Master initialization

use tracing::info;
use trellis_common::template::TemplateKind;
use trellis_common::Result;

use crate::context::BootstrapContext;
use crate::machine::Machine;
use crate::params::{InitCommandFields, InitParameters};
use crate::remote::ConsoleOutput;
use crate::reset::reset;

/// Render the `kubeadm init` command for these parameters
pub fn render_init_command(ctx: &BootstrapContext, params: &InitParameters) -> Result<String> {
    let fields = InitCommandFields::new(params, &ctx.settings);
    Ok(ctx.renderer.render(TemplateKind::InitCommand, &fields)?)
}

/// Reset the master, then run `kubeadm init` on it
///
/// Reset failures are logged and tolerated. The init command itself is a hard
/// failure. On success the console output holds the join commands.
pub async fn initialize_master(
    ctx: &BootstrapContext,
    master: &Machine,
    pod_cidr: &str,
    service_cidr: &str,
) -> Result<ConsoleOutput> {
    let report = reset(ctx, master).await;
    if !report.is_clean() {
        info!(
            machine = %master.ip,
            failed = report.failures().count(),
            "master reset had failures, continuing with init"
        );
    }
    run_init(ctx, master, &InitParameters::new(&master.ip, pod_cidr, service_cidr)).await
}

/// Run `kubeadm init` without resetting first
pub async fn run_init(
    ctx: &BootstrapContext,
    master: &Machine,
    params: &InitParameters,
) -> Result<ConsoleOutput> {
    // Render before touching the machine so a bad template costs nothing
    let command = render_init_command(ctx, params)?;
    info!(machine = %master.ip, pod_cidr = %params.pod_cidr, service_cidr = %params.service_cidr, "initializing control plane");
    let output = ctx.run(master, &command).await?;
    info!(machine = %master.ip, "control plane initialized");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemoteExecutor;
    use crate::reset::LIST_WORKDIR_COMMAND;
    use std::sync::{Arc, Mutex};
    use trellis_common::template::TemplateCatalog;
    use trellis_common::{Error, TransportError};

    const INIT_OUTPUT: &str = "Your Kubernetes control-plane has initialized successfully!\n";

    #[test]
    fn rendered_command_carries_parameters() {
        let ctx = BootstrapContext::new(Arc::new(MockRemoteExecutor::new())).expect("context");
        let params = InitParameters::new("10.0.0.1", "10.244.0.0/16", "10.96.0.0/12");
        let command = render_init_command(&ctx, &params).expect("renders");
        assert!(command.starts_with("kubeadm init"));
        assert!(command.contains("--apiserver-advertise-address=10.0.0.1"));
        assert!(command.contains("--pod-network-cidr=10.244.0.0/16"));
        assert!(command.contains("--service-cidr=10.96.0.0/12"));
        assert!(command.contains("--kubernetes-version=v1.28.2"));
    }

    #[tokio::test]
    async fn initialize_resets_then_inits() {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let seen = commands.clone();
        let mut executor = MockRemoteExecutor::new();
        executor.expect_run().returning(move |_, cmd| {
            seen.lock().unwrap().push(cmd.to_string());
            if cmd == LIST_WORKDIR_COMMAND {
                Ok(ConsoleOutput::from("init.sh\n"))
            } else if cmd.starts_with("kubeadm init") {
                Ok(ConsoleOutput::from(INIT_OUTPUT))
            } else {
                Ok(ConsoleOutput::default())
            }
        });
        let ctx = BootstrapContext::new(Arc::new(executor)).expect("context");

        let output = initialize_master(&ctx, &Machine::new("10.0.0.1", "master"), "10.244.0.0/16", "10.96.0.0/12")
            .await
            .expect("init succeeds");

        assert_eq!(output.as_str(), INIT_OUTPUT);
        let commands = commands.lock().unwrap();
        assert!(commands.last().expect("ran").starts_with("kubeadm init"));
        assert!(commands.iter().any(|c| c == "echo y | kubeadm reset"));
    }

    #[tokio::test]
    async fn init_failure_surfaces_remote_text() {
        let mut executor = MockRemoteExecutor::new();
        executor.expect_run().returning(|_, cmd| {
            if cmd.starts_with("kubeadm init") {
                Err(TransportError::NonZeroExit {
                    status: 1,
                    stderr: "[ERROR Port-6443]: Port 6443 is in use".to_string(),
                })
            } else {
                Ok(ConsoleOutput::from("init.sh\n"))
            }
        });
        let ctx = BootstrapContext::new(Arc::new(executor)).expect("context");

        let err = initialize_master(&ctx, &Machine::new("10.0.0.1", "master"), "10.244.0.0/16", "10.96.0.0/12")
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("Port 6443 is in use"));
    }

    #[tokio::test]
    async fn malformed_template_fails_before_any_remote_call() {
        let mut executor = MockRemoteExecutor::new();
        executor.expect_run().never();
        let ctx = BootstrapContext::builder(Arc::new(executor))
            .catalog(
                TemplateCatalog::embedded()
                    .with_override(TemplateKind::InitCommand, "kubeadm init {% if ip %}"),
            )
            .build()
            .expect("context");

        let params = InitParameters::new("10.0.0.1", "10.244.0.0/16", "10.96.0.0/12");
        let err = run_init(&ctx, &Machine::new("10.0.0.1", "master"), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
