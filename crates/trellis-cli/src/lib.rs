//! Trellis CLI library

pub mod commands;
pub mod error;
pub mod plan;
pub mod ssh;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// Trellis - bootstrap kubeadm clusters on machines you already have
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reset every machine, initialize the master, and join the workers
    Bootstrap(commands::bootstrap::BootstrapArgs),
    /// Return machines to a pre-cluster state
    Reset(commands::reset::ResetArgs),
    /// Print a fresh worker join command from the master
    JoinToken(commands::token::TokenArgs),
    /// Apply the plan's node labels
    Label(commands::label::LabelArgs),
    /// Remove the no-schedule taint from control-plane nodes
    Untaint(commands::untaint::UntaintArgs),
    /// Render a template locally without touching any machine
    Render(commands::render::RenderArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Bootstrap(args) => commands::bootstrap::run(args).await,
            Commands::Reset(args) => commands::reset::run(args).await,
            Commands::JoinToken(args) => commands::token::run(args).await,
            Commands::Label(args) => commands::label::run(args).await,
            Commands::Untaint(args) => commands::untaint::run(args).await,
            Commands::Render(args) => commands::render::run(args).await,
        }
    }
}
