//! Trellis CLI
//!
//! Bootstraps kubeadm clusters on existing machines over SSH.

use clap::Parser;
use trellis_common::telemetry::{init_telemetry, TelemetryConfig};

use trellis_cli::{Cli, Error, Result};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(TelemetryConfig::default()).map_err(|e| Error::command_failed(e.to_string()))?;

    let cli = Cli::parse();
    cli.run().await
}
