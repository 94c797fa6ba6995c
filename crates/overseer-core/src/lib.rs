//! Core types and error definitions for the Overseer orchestrator.
//!
//! This crate holds what every other Overseer crate agrees on: the error
//! taxonomy and the parameter mapping tasks carry to their agents.
//!
//! # Main types
//!
//! - [`OverseerError`]: Unified error enum for the scheduler, agents and gateway.
//! - [`OverseerResult`]: Convenience alias for `Result<T, OverseerError>`.
//! - [`Params`]: String-keyed JSON mapping consumed by agents.

/// Error taxonomy.
pub mod error;

pub use error::{OverseerError, OverseerResult};

/// Free-form parameters attached to a task or passed to an agent operation.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Render a JSON value as the text an agent matches against.
///
/// Strings are returned verbatim, arrays are flattened with a space between
/// elements, anything else uses its JSON form.
pub fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(" "),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_text_string() {
        assert_eq!(value_text(&json!("timeout")), "timeout");
    }

    #[test]
    fn test_value_text_array_flattens() {
        let text = value_text(&json!(["high_latency", ["connection_refused"], 3]));
        assert_eq!(text, "high_latency connection_refused 3");
    }

    #[test]
    fn test_value_text_null_is_empty() {
        assert!(value_text(&serde_json::Value::Null).is_empty());
    }
}
