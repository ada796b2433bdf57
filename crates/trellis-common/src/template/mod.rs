//! Named templates for commands, scripts, and manifests
//!
//! Every remote artifact a bootstrap attempt sends to a machine (the init
//! command, the tooling install script, the overlay network manifest) is
//! rendered from a named template:
//!
//! - `${field}` - value from the parameter record
//! - `$${...}` - literal `${...}` for shell parameter expansion
//! - `{% if %}...{% endif %}` - conditionals
//! - Filters: `${value | base64_encode}`, `${value | default("x")}`,
//!   `${value | required}`, `${value | lower}`

mod catalog;
mod engine;
mod error;
mod filters;
mod renderer;

pub use catalog::{TemplateCatalog, TemplateKind};
pub use engine::TemplateEngine;
pub use error::TemplateError;
pub use renderer::TemplateRenderer;
