//! Template error types

use std::fmt;
use std::path::PathBuf;

use minijinja::ErrorKind;

/// Errors that can occur during template operations
#[derive(Debug)]
pub enum TemplateError {
    /// No template is registered under the requested name
    Unknown(String),
    /// Template syntax is invalid
    Syntax(minijinja::Error),
    /// Template references a field the parameters don't provide
    Undefined(minijinja::Error),
    /// Any other rendering failure (filters, type errors)
    Render(minijinja::Error),
    /// An override template could not be read
    Io {
        /// Path of the override file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl TemplateError {
    /// Create an unknown-template error
    pub fn unknown(name: &str) -> Self {
        Self::Unknown(name.to_string())
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown template: {}", name),
            Self::Syntax(e) => write!(f, "template syntax error: {}", e),
            Self::Undefined(e) => write!(f, "undefined template field: {}", e),
            Self::Render(e) => write!(f, "template render error: {}", e),
            Self::Io { path, source } => {
                write!(f, "failed to read template {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax(e) | Self::Undefined(e) | Self::Render(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            Self::Unknown(_) => None,
        }
    }
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            ErrorKind::SyntaxError => Self::Syntax(err),
            ErrorKind::UndefinedError => Self::Undefined(err),
            _ => Self::Render(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_display() {
        let err = TemplateError::unknown("join-command");
        assert!(err.to_string().contains("unknown template"));
        assert!(err.to_string().contains("join-command"));
    }

    #[test]
    fn test_classifies_undefined() {
        let err: TemplateError =
            minijinja::Error::new(ErrorKind::UndefinedError, "pod_cidr is undefined").into();
        assert!(matches!(err, TemplateError::Undefined(_)));
    }

    #[test]
    fn test_classifies_syntax() {
        let err: TemplateError = minijinja::Error::new(ErrorKind::SyntaxError, "unexpected }").into();
        assert!(matches!(err, TemplateError::Syntax(_)));
        assert!(err.to_string().contains("syntax error"));
    }
}
