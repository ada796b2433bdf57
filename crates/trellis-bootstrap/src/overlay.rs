//! Pod network overlay installation

use tracing::info;
use trellis_common::template::TemplateKind;
use trellis_common::Result;

use crate::context::BootstrapContext;
use crate::machine::Machine;
use crate::params::NetworkOverlayParameters;

/// Render the overlay manifest for these parameters
pub fn render_overlay_manifest(
    ctx: &BootstrapContext,
    params: &NetworkOverlayParameters,
) -> Result<String> {
    params.validate()?;
    Ok(ctx.renderer.render(TemplateKind::OverlayManifest, params)?)
}

/// Write the overlay manifest to the master and apply it
///
/// Every failure here is hard: a cluster without a pod network is unusable.
pub async fn install_overlay(
    ctx: &BootstrapContext,
    master: &Machine,
    params: &NetworkOverlayParameters,
) -> Result<()> {
    let manifest = render_overlay_manifest(ctx, params)?;
    let path = ctx.settings.overlay_manifest_path.as_str();

    info!(machine = %master.ip, net_mode = %params.net_mode, path, "installing overlay network");
    ctx.write_artifact(master, path, &manifest).await?;
    ctx.run(master, &format!("kubectl apply -f {}", path)).await?;
    info!(machine = %master.ip, "overlay network applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::NetMode;
    use crate::remote::{ConsoleOutput, MockRemoteExecutor};
    use std::sync::Arc;
    use trellis_common::{Error, TransportError};

    fn master() -> Machine {
        Machine::new("10.0.0.1", "master")
    }

    #[test]
    fn manifest_carries_pod_cidr_and_backend() {
        let ctx = BootstrapContext::new(Arc::new(MockRemoteExecutor::new())).expect("context");
        let params = NetworkOverlayParameters::new("10.244.0.0/16", NetMode::HostGw);
        let manifest = render_overlay_manifest(&ctx, &params).expect("renders");
        assert!(manifest.contains(r#""Network": "10.244.0.0/16""#));
        assert!(manifest.contains(r#""Type": "host-gw""#));
        assert!(!manifest.contains("access-key-id"));
    }

    #[test]
    fn ali_vpc_manifest_embeds_encoded_credentials() {
        let ctx = BootstrapContext::new(Arc::new(MockRemoteExecutor::new())).expect("context");
        let params = NetworkOverlayParameters::new("10.244.0.0/16", NetMode::AliVpc)
            .with_credentials("hello", "world");
        let manifest = render_overlay_manifest(&ctx, &params).expect("renders");
        assert!(manifest.contains("access-key-id: aGVsbG8="));
        assert!(manifest.contains("access-key-secret: d29ybGQ="));
        assert!(!manifest.contains("world\n"));
    }

    #[tokio::test]
    async fn writes_then_applies_manifest() {
        let mut executor = MockRemoteExecutor::new();
        let mut seq = mockall::Sequence::new();
        executor
            .expect_write_artifact()
            .withf(|m, path, contents| {
                m.ip == "10.0.0.1" && path == "flannel.yaml" && contents.contains("10.244.0.0/16")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        executor
            .expect_run()
            .withf(|_, cmd| cmd == "kubectl apply -f flannel.yaml")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(ConsoleOutput::from("daemonset.apps/kube-flannel-ds created\n")));
        let ctx = BootstrapContext::new(Arc::new(executor)).expect("context");

        install_overlay(&ctx, &master(), &NetworkOverlayParameters::new("10.244.0.0/16", NetMode::Vxlan))
            .await
            .expect("installs");
    }

    #[tokio::test]
    async fn write_failure_skips_apply() {
        let mut executor = MockRemoteExecutor::new();
        executor
            .expect_write_artifact()
            .returning(|_, _, _| Err(TransportError::Other("disk full".to_string())));
        executor.expect_run().never();
        let ctx = BootstrapContext::new(Arc::new(executor)).expect("context");

        let err = install_overlay(&ctx, &master(), &NetworkOverlayParameters::new("10.244.0.0/16", NetMode::Vxlan))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_remote_calls() {
        let mut executor = MockRemoteExecutor::new();
        executor.expect_write_artifact().never();
        executor.expect_run().never();
        let ctx = BootstrapContext::new(Arc::new(executor)).expect("context");

        let err = install_overlay(&ctx, &master(), &NetworkOverlayParameters::new("10.244.0.0/16", NetMode::AliVpc))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
