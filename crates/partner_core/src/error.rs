use shared::error::RemoteQueryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("request to {base_url} failed: {message}")]
    Backend { base_url: String, message: String },
    #[error("read model query failed: {0}")]
    RemoteQuery(#[from] RemoteQueryError),
    #[error("unreadable response from {base_url}: {message}")]
    Decode { base_url: String, message: String },
}

impl QueryError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn backend(base_url: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            base_url: base_url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn decode(base_url: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            base_url: base_url.to_string(),
            message: message.into(),
        }
    }
}
