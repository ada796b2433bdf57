//! Cluster bootstrap orchestrator
//!
//! Drives already-provisioned machines through `kubeadm` over a remote shell:
//! reset, master init, join command extraction, overlay install, credential
//! retrieval, labels, and taint removal. Every remote call goes through the
//! [`RemoteExecutor`] port, so the whole protocol runs against a mock in tests.
//!
//! # Example
//!
//! ```ignore
//! let ctx = BootstrapContext::builder(Arc::new(my_executor))
//!     .settings(settings)
//!     .build()?;
//! let outcome = ClusterBootstrapper::new(Arc::new(ctx)).bootstrap(&plan).await?;
//! ```

#![deny(missing_docs)]

pub mod context;
pub mod credentials;
pub mod init;
pub mod join;
pub mod labels;
pub mod machine;
pub mod orchestrator;
pub mod outcome;
pub mod overlay;
pub mod params;
pub mod plan;
pub mod pool;
pub mod remote;
pub mod reset;

pub use context::{BootstrapContext, BootstrapContextBuilder};
pub use credentials::{retrieve_credentials, CredentialBundle};
pub use init::{initialize_master, render_init_command};
pub use join::{
    extract_join_commands, join_worker, request_join_token, request_worker_join, JoinCommand,
    JoinCommands, JoinRole,
};
pub use labels::{apply_labels, remove_master_taint};
pub use machine::{canonicalize_hostname, Machine};
pub use orchestrator::{
    BootstrapFailure, BootstrapOutcome, BootstrapPhase, ClusterBootstrapper, WorkerJoin,
};
pub use outcome::{StepOutcome, StepReport, StepStatus};
pub use overlay::{install_overlay, render_overlay_manifest};
pub use params::{InitParameters, NetMode, NetworkOverlayParameters};
pub use plan::{ClusterPlan, NetworkPlan};
pub use remote::{BoundedExecutor, ConsoleOutput, RemoteExecutor};
pub use reset::{render_bootstrap_script, reset, ResetStep};
