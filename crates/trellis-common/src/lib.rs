//! Common types for trellis: errors, templates, settings, and telemetry

#![deny(missing_docs)]

pub mod error;
pub mod settings;
pub mod shell;
pub mod telemetry;
pub mod template;

pub use error::{Error, TransportError};
pub use settings::BootstrapSettings;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Marker every kubeadm join command contains
pub const JOIN_DIRECTIVE: &str = "kubeadm join";

/// Identity marker present in a valid admin kubeconfig
pub const ADMIN_IDENTITY_MARKER: &str = "kubernetes-admin";

/// Certificate marker present in a valid admin kubeconfig
pub const CERTIFICATE_DATA_MARKER: &str = "client-certificate-data";
