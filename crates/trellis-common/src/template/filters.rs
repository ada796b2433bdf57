//! Custom filters available to every template
//!
//! - `default`: Provide fallback for undefined values
//! - `base64_encode`: Encode string to base64 (Secret data fields)
//! - `required`: Fail if value is undefined or empty
//! - `lower`: Lowercase a string

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{Error, ErrorKind, Value};

/// Default filter - returns fallback if value is undefined or none
///
/// Usage: `${value | default("fallback")}`
pub fn default_filter(value: Value, fallback: Value) -> Value {
    if value.is_undefined() || value.is_none() {
        fallback
    } else {
        value
    }
}

/// Base64 encode filter
///
/// Usage: `${value | base64_encode}`
pub fn base64_encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Required filter - fails if value is undefined or an empty string
///
/// Usage: `${value | required}`
pub fn required(value: Value) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        return Err(Error::new(
            ErrorKind::UndefinedError,
            "required value is undefined",
        ));
    }
    if value.as_str().is_some_and(str::is_empty) {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "required value is empty",
        ));
    }
    Ok(value)
}

/// Lowercase filter
pub fn lower(value: &str) -> String {
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_with_value() {
        let result = default_filter(Value::from("10.244.0.0/16"), Value::from("fallback"));
        assert_eq!(result.as_str(), Some("10.244.0.0/16"));
    }

    #[test]
    fn test_default_filter_with_undefined() {
        let result = default_filter(Value::UNDEFINED, Value::from("fallback"));
        assert_eq!(result.as_str(), Some("fallback"));
    }

    #[test]
    fn test_base64_encode() {
        assert_eq!(base64_encode("hello"), "aGVsbG8=");
        assert_eq!(base64_encode(""), "");
    }

    #[test]
    fn test_required_rejects_undefined_and_empty() {
        assert!(required(Value::UNDEFINED).is_err());
        assert!(required(Value::from("")).is_err());
        assert!(required(Value::from("LTAI-key")).is_ok());
    }

    #[test]
    fn test_lower() {
        assert_eq!(lower("Worker-01"), "worker-01");
    }
}
