//! Command template renderer
//!
//! Pure function of (template kind, parameter record): no network, no
//! filesystem. Parameters are any `Serialize` struct whose field names match
//! the template's placeholders.

use minijinja::Value;
use serde::Serialize;
use tracing::trace;

use super::catalog::{TemplateCatalog, TemplateKind};
use super::engine::TemplateEngine;
use super::error::TemplateError;

/// Renders catalog templates with per-machine parameters
#[derive(Debug)]
pub struct TemplateRenderer {
    engine: TemplateEngine,
    catalog: TemplateCatalog,
}

impl TemplateRenderer {
    /// Renderer over the embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        Self::with_catalog(TemplateCatalog::embedded())
    }

    /// Renderer over a custom catalog
    pub fn with_catalog(catalog: TemplateCatalog) -> Result<Self, TemplateError> {
        Ok(Self {
            engine: TemplateEngine::new()?,
            catalog,
        })
    }

    /// Render a template by kind
    pub fn render<P: Serialize>(&self, kind: TemplateKind, params: &P) -> Result<String, TemplateError> {
        trace!(template = %kind, "rendering template");
        self.engine.render(
            kind.name(),
            self.catalog.source(kind),
            Value::from_serialize(params),
        )
    }

    /// Render a template by resource name (`init-command`, `overlay-manifest`, ...)
    pub fn render_named<P: Serialize>(&self, name: &str, params: &P) -> Result<String, TemplateError> {
        self.render(name.parse()?, params)
    }

    /// The catalog this renderer draws from
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }
}
