//! Shared state for every bootstrap operation
//!
//! Operations are free functions taking `&BootstrapContext`, so tests can
//! drive any single step against a mock executor without building the whole
//! orchestrator.

use std::sync::Arc;

use trellis_common::template::{TemplateCatalog, TemplateRenderer};
use trellis_common::{BootstrapSettings, Error, Result};

use crate::machine::Machine;
use crate::remote::{BoundedExecutor, ConsoleOutput, RemoteExecutor};

/// Executor, renderer, and settings for one bootstrap attempt
pub struct BootstrapContext {
    /// Remote Execution Port, already wrapped with the per-call timeout
    pub executor: Arc<dyn RemoteExecutor>,
    /// Renderer over the embedded (or overridden) templates
    pub renderer: Arc<TemplateRenderer>,
    /// Tunables
    pub settings: BootstrapSettings,
}

impl BootstrapContext {
    /// Create a builder around a transport
    pub fn builder(executor: Arc<dyn RemoteExecutor>) -> BootstrapContextBuilder {
        BootstrapContextBuilder::new(executor)
    }

    /// Context with default settings and embedded templates
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Result<Self> {
        Self::builder(executor).build()
    }

    /// Run a command, attributing any transport failure to the machine
    pub async fn run(&self, machine: &Machine, command: &str) -> Result<ConsoleOutput> {
        self.executor
            .run(machine, command)
            .await
            .map_err(|e| Error::transport(&machine.ip, e))
    }

    /// Write a file, attributing any transport failure to the machine
    pub async fn write_artifact(&self, machine: &Machine, path: &str, contents: &str) -> Result<()> {
        self.executor
            .write_artifact(machine, path, contents)
            .await
            .map_err(|e| Error::transport(&machine.ip, e))
    }
}

impl std::fmt::Debug for BootstrapContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BootstrapContext`]
pub struct BootstrapContextBuilder {
    executor: Arc<dyn RemoteExecutor>,
    settings: BootstrapSettings,
    catalog: Option<TemplateCatalog>,
}

impl BootstrapContextBuilder {
    fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self {
            executor,
            settings: BootstrapSettings::default(),
            catalog: None,
        }
    }

    /// Use these settings instead of the defaults
    pub fn settings(mut self, settings: BootstrapSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use this template catalog instead of loading one from `settings.template_dir`
    pub fn catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Validate settings, load templates, and wrap the executor with the timeout
    pub fn build(self) -> Result<BootstrapContext> {
        self.settings.validate()?;

        let catalog = match (self.catalog, &self.settings.template_dir) {
            (Some(catalog), _) => catalog,
            (None, Some(dir)) => TemplateCatalog::load_overrides(dir)?,
            (None, None) => TemplateCatalog::embedded(),
        };
        let renderer = TemplateRenderer::with_catalog(catalog)?;
        let executor: Arc<dyn RemoteExecutor> = Arc::new(BoundedExecutor::new(
            self.executor,
            self.settings.command_timeout(),
        ));

        Ok(BootstrapContext {
            executor,
            renderer: Arc::new(renderer),
            settings: self.settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemoteExecutor;
    use trellis_common::TransportError;

    #[test]
    fn build_rejects_invalid_settings() {
        let settings = BootstrapSettings {
            concurrency: 0,
            ..Default::default()
        };
        let result = BootstrapContext::builder(Arc::new(MockRemoteExecutor::new()))
            .settings(settings)
            .build();
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn run_attributes_transport_errors_to_machine() {
        let mut executor = MockRemoteExecutor::new();
        executor
            .expect_run()
            .returning(|_, _| Err(TransportError::Connect("connection refused".to_string())));
        let ctx = BootstrapContext::new(Arc::new(executor)).expect("context builds");

        let err = ctx
            .run(&Machine::new("10.0.0.9", "w9"), "true")
            .await
            .unwrap_err();
        match err {
            Error::Transport { machine, source } => {
                assert_eq!(machine, "10.0.0.9");
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
