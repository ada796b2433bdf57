//! Render command - show what a template renders to for a plan
//!
//! Nothing is sent to any machine.

use clap::Args;
use trellis_bootstrap::{render_bootstrap_script, render_init_command, render_overlay_manifest};
use trellis_common::template::TemplateKind;

use super::PlanArgs;
use crate::Result;

/// Render command arguments
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Template to render (init-command, overlay-manifest, bootstrap-script)
    pub template: String,
}

/// Run the render command
pub async fn run(args: RenderArgs) -> Result<()> {
    let kind: TemplateKind = args
        .template
        .parse()
        .map_err(trellis_common::Error::from)?;
    let (plan, ctx) = args.plan.context()?;

    let rendered = match kind {
        TemplateKind::InitCommand => render_init_command(&ctx, &plan.cluster.init_parameters())?,
        TemplateKind::OverlayManifest => {
            render_overlay_manifest(&ctx, &plan.cluster.overlay_parameters())?
        }
        TemplateKind::BootstrapScript => render_bootstrap_script(&ctx)?,
    };
    println!("{}", rendered);
    Ok(())
}
