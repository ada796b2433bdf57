//! Template engine for shell commands and manifests
//!
//! Uses minijinja with custom syntax configuration:
//! - Variable delimiters: `${...}`
//! - Block delimiters: `{%...%}`
//! - Comment delimiters: `{#...#}`
//! - Escape: `$${...}` produces literal `${...}` so shell parameter expansion
//!   can still be written inside a template
//!
//! Undefined fields are an error at render time; a template that references
//! a field its parameters don't declare never renders to silently-empty text.

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior, Value};

use super::error::TemplateError;
use super::filters;

/// Placeholder for escaped `$${` during preprocessing
const ESCAPED_PLACEHOLDER: &str = "\x00__TRELLIS_ESCAPED_DOLLAR_BRACE__\x00";

/// Strict template engine shared by every renderer
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine {
    /// Create a new template engine with `${...}` syntax and strict undefined handling
    pub fn new() -> Result<Self, TemplateError> {
        let syntax = SyntaxConfig::builder()
            .variable_delimiters("${", "}")
            .block_delimiters("{%", "%}")
            .comment_delimiters("{#", "#}")
            .build()
            .map_err(TemplateError::from)?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        env.add_filter("default", filters::default_filter);
        env.add_filter("base64_encode", filters::base64_encode);
        env.add_filter("required", filters::required);
        env.add_filter("lower", filters::lower);

        Ok(Self { env })
    }

    /// Render a named template source with the given context
    ///
    /// The name only shows up in error messages. The source is compiled on
    /// every call, so a malformed template fails here rather than at startup.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if:
    /// - Template syntax is invalid
    /// - A referenced field is undefined
    /// - A filter operation fails
    pub fn render(&self, name: &str, source: &str, ctx: Value) -> Result<String, TemplateError> {
        let preprocessed = source.replace("$${", ESCAPED_PLACEHOLDER);

        let rendered = self
            .env
            .render_named_str(name, &preprocessed, ctx)
            .map_err(TemplateError::from)?;

        Ok(rendered.replace(ESCAPED_PLACEHOLDER, "${"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ctx(pairs: &[(&str, &str)]) -> Value {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Value::from_serialize(&map)
    }

    fn engine() -> TemplateEngine {
        TemplateEngine::new().expect("engine should build")
    }

    #[test]
    fn test_simple_variable() {
        let result = engine()
            .render("t", "--pod-network-cidr=${pod_cidr}", ctx(&[("pod_cidr", "10.244.0.0/16")]))
            .expect("simple variable should render successfully");
        assert_eq!(result, "--pod-network-cidr=10.244.0.0/16");
    }

    #[test]
    fn test_undefined_strict() {
        let result = engine().render("t", "${undefined_var}", ctx(&[]));
        assert!(matches!(result, Err(TemplateError::Undefined(_))));
    }

    #[test]
    fn test_malformed_template_is_syntax_error() {
        let result = engine().render("t", "{% if ip %}no end", ctx(&[("ip", "10.0.0.1")]));
        assert!(matches!(result, Err(TemplateError::Syntax(_))));
    }

    #[test]
    fn test_escape_produces_literal_shell_expansion() {
        let result = engine()
            .render("t", "echo $${HOME} ${ip}", ctx(&[("ip", "10.0.0.1")]))
            .expect("escape syntax should render successfully");
        assert_eq!(result, "echo ${HOME} 10.0.0.1");
    }

    #[test]
    fn test_plain_dollar_passes_through() {
        let result = engine()
            .render("t", "cat $HOME/.kube/config", ctx(&[]))
            .expect("dollar without brace should pass through");
        assert_eq!(result, "cat $HOME/.kube/config");
    }

    #[test]
    fn test_conditional_block() {
        let template = r#"{% if mode == "ali-vpc" %}cloud{% else %}local{% endif %}"#;
        let result = engine()
            .render("t", template, ctx(&[("mode", "vxlan")]))
            .expect("conditional block should render successfully");
        assert_eq!(result, "local");
    }

    #[test]
    fn test_base64_filter_in_template() {
        let result = engine()
            .render("t", "${secret | base64_encode}", ctx(&[("secret", "hello")]))
            .expect("base64_encode filter should render successfully");
        assert_eq!(result, "aGVsbG8=");
    }
}
