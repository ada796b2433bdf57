//! Named template catalog
//!
//! Templates are consumed by name, not by file path. Each name maps to an
//! embedded source compiled into the binary; an operator can replace any of
//! them by dropping a file with the same name into an override directory.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use super::error::TemplateError;

const INIT_COMMAND: &str = include_str!("../../templates/init-command.sh");
const OVERLAY_MANIFEST: &str = include_str!("../../templates/overlay-manifest.yaml");
const BOOTSTRAP_SCRIPT: &str = include_str!("../../templates/bootstrap-script.sh");

/// The templates a bootstrap attempt renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// `kubeadm init` command for the master
    InitCommand,
    /// Overlay network (flannel) manifest
    OverlayManifest,
    /// Tooling install script written to every machine on first reset
    BootstrapScript,
}

impl TemplateKind {
    /// Every known template
    pub const ALL: [TemplateKind; 3] = [
        TemplateKind::InitCommand,
        TemplateKind::OverlayManifest,
        TemplateKind::BootstrapScript,
    ];

    /// Resource name of the template
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitCommand => "init-command",
            Self::OverlayManifest => "overlay-manifest",
            Self::BootstrapScript => "bootstrap-script",
        }
    }

    /// Fields the template expects in its parameters
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::InitCommand => &[
                "ip",
                "pod_cidr",
                "service_cidr",
                "kubernetes_version",
                "image_repository",
            ],
            Self::OverlayManifest => &["pod_cidr", "access_key", "access_secret", "net_mode"],
            Self::BootstrapScript => &["kubernetes_version", "kubernetes_minor", "image_repository"],
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            Self::InitCommand => INIT_COMMAND,
            Self::OverlayManifest => OVERLAY_MANIFEST,
            Self::BootstrapScript => BOOTSTRAP_SCRIPT,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemplateKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| TemplateError::unknown(s))
    }
}

/// Template sources keyed by kind, embedded unless overridden
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    overrides: HashMap<TemplateKind, String>,
}

impl TemplateCatalog {
    /// Catalog with only the embedded sources
    pub fn embedded() -> Self {
        Self::default()
    }

    /// Replace one template's source
    pub fn with_override(mut self, kind: TemplateKind, source: impl Into<String>) -> Self {
        self.overrides.insert(kind, source.into());
        self
    }

    /// Load overrides from `dir/<template-name>` for every file that exists
    pub fn load_overrides(dir: &Path) -> Result<Self, TemplateError> {
        let mut catalog = Self::embedded();
        for kind in TemplateKind::ALL {
            let path = dir.join(kind.name());
            if !path.is_file() {
                debug!(template = %kind, path = %path.display(), "no override, using embedded");
                continue;
            }
            let source = std::fs::read_to_string(&path)
                .map_err(|source| TemplateError::Io { path: path.clone(), source })?;
            info!(template = %kind, path = %path.display(), "loaded template override");
            catalog.overrides.insert(kind, source);
        }
        Ok(catalog)
    }

    /// Source text for a template
    pub fn source(&self, kind: TemplateKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.embedded())
    }

    /// Whether a template is overridden
    pub fn is_overridden(&self, kind: TemplateKind) -> bool {
        self.overrides.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in TemplateKind::ALL {
            assert_eq!(kind.name().parse::<TemplateKind>().expect("known name"), kind);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "join-command".parse::<TemplateKind>().unwrap_err();
        assert!(matches!(err, TemplateError::Unknown(name) if name == "join-command"));
    }

    #[test]
    fn embedded_sources_reference_their_declared_fields() {
        let catalog = TemplateCatalog::embedded();
        for kind in TemplateKind::ALL {
            let source = catalog.source(kind);
            for field in kind.fields() {
                assert!(
                    source.contains(field),
                    "{} does not reference {}",
                    kind,
                    field
                );
            }
        }
    }

    #[test]
    fn override_replaces_embedded_source() {
        let catalog = TemplateCatalog::embedded()
            .with_override(TemplateKind::InitCommand, "kubeadm init --dry-run");
        assert_eq!(catalog.source(TemplateKind::InitCommand), "kubeadm init --dry-run");
        assert!(catalog.is_overridden(TemplateKind::InitCommand));
        assert!(!catalog.is_overridden(TemplateKind::OverlayManifest));
    }

    #[test]
    fn load_overrides_reads_only_present_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bootstrap-script"), "#!/bin/sh\ntrue\n")
            .expect("write override");

        let catalog = TemplateCatalog::load_overrides(dir.path()).expect("overrides load");
        assert_eq!(catalog.source(TemplateKind::BootstrapScript), "#!/bin/sh\ntrue\n");
        assert!(!catalog.is_overridden(TemplateKind::InitCommand));
    }
}
