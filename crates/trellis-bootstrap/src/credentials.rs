//! Admin credential retrieval

use std::fmt;

use tracing::info;
use trellis_common::{Error, Result, ADMIN_IDENTITY_MARKER, CERTIFICATE_DATA_MARKER};

use crate::context::BootstrapContext;
use crate::machine::Machine;

/// Copies the admin kubeconfig into the invoking user's home and prints it
pub const CREDENTIALS_COMMAND: &str = "mkdir -p $HOME/.kube \
&& sudo cp -f /etc/kubernetes/admin.conf $HOME/.kube/config \
&& sudo chown $(id -u):$(id -g) $HOME/.kube/config \
&& cat $HOME/.kube/config";

/// An admin kubeconfig known to carry the admin identity and client certificate
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle(String);

impl CredentialBundle {
    /// Validate kubeconfig text
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for marker in [ADMIN_IDENTITY_MARKER, CERTIFICATE_DATA_MARKER] {
            if !text.contains(marker) {
                return Err(Error::InvalidCredentialFormat { missing: marker });
            }
        }
        Ok(Self(text))
    }

    /// The kubeconfig text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the kubeconfig text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CredentialBundle").field(&"<redacted>").finish()
    }
}

/// Fetch and validate the admin kubeconfig from the master
pub async fn retrieve_credentials(ctx: &BootstrapContext, master: &Machine) -> Result<CredentialBundle> {
    info!(machine = %master.ip, "retrieving admin credentials");
    let output = ctx.run(master, CREDENTIALS_COMMAND).await?;
    let bundle = CredentialBundle::parse(output.into_string())?;
    info!(machine = %master.ip, bytes = bundle.as_str().len(), "admin credentials retrieved");
    Ok(bundle)
}
