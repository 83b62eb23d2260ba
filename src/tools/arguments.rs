//! Typed access to tool call arguments.

use crate::error::SwitchyardError;

/// Wrapper around tool call arguments providing typed extraction.
///
/// Some providers hand back arguments as a JSON-encoded string; those are
/// decoded on construction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        let value = match value {
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(trimmed).unwrap_or(serde_json::Value::String(raw))
                }
            }
            serde_json::Value::Null => serde_json::json!({}),
            other => other,
        };
        Self { value }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, SwitchyardError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwitchyardError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get a string argument, falling back to `default` when absent.
    pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str_opt(key).unwrap_or(default)
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, SwitchyardError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            SwitchyardError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
