//! Error types for Trafficwatch

use thiserror::Error;

/// Result type alias using Trafficwatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Longest remote error text kept in an error message, in characters
pub(crate) const MAX_ERROR_BODY: usize = 512;

/// Cut remote error text to [`MAX_ERROR_BODY`] characters
pub(crate) fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

/// Error types for Trafficwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source could not be read or deserialized
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    /// Network-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from a remote endpoint
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        /// Which endpoint answered
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Errors reported by the metrics API itself
    #[error("Metrics API error: {0}")]
    Api(String),

    /// Response did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Alert could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Whether this error means the metrics source could not be checked.
    ///
    /// Configuration problems are not included: they are never a signal about the
    /// monitored zone.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Api(_) | Self::MalformedResponse(_)
        )
    }

    /// Short machine-friendly name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::ConfigSource(_) => "configuration",
            Self::Http(_) | Self::Status { .. } | Self::Api(_) => "transport",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Notification(_) => "notification",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
