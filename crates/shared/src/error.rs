use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured error body returned by the relational read model.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", self.describe())]
pub struct RemoteQueryError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl RemoteQueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    fn describe(&self) -> String {
        let mut out = match &self.code {
            Some(code) => format!("{code}: {}", self.message),
            None => self.message.clone(),
        };
        if let Some(details) = &self.details {
            out.push_str(&format!(" ({details})"));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!(" hint: {hint}"));
        }
        out
    }
}

/// Error body of the action endpoint, `{"detail": ...}` where `detail` is a
/// string or a list of validation entries.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointErrorBody {
    pub detail: Value,
}

impl EndpointErrorBody {
    pub fn summary(&self) -> String {
        match &self.detail {
            Value::String(detail) => detail.clone(),
            Value::Array(entries) => entries
                .iter()
                .map(|entry| {
                    entry
                        .get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| entry.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
