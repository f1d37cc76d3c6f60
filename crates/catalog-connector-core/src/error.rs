//! Error types for connector operations.

use thiserror::Error;

/// Errors that can occur while listing, describing or fetching tables.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The API answered with a non-success status.
    ///
    /// The display form is what the host shows the user, so keep it stable.
    #[error("Request failed: {status} {status_text}")]
    RequestFailed {
        /// Numeric HTTP status.
        status: u16,
        /// Canonical reason phrase for the status.
        status_text: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Credential exchange or login failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Query mode was submitted without query text.
    #[error("a query is required in query mode")]
    EmptyQuery,

    /// No table with the given id exists in the current schema.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Invalid connector configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConnectorError {
    /// Builds a [`ConnectorError::RequestFailed`] from a numeric status.
    pub fn request_failed(status: u16) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
            .to_string();

        Self::RequestFailed {
            status,
            status_text,
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
