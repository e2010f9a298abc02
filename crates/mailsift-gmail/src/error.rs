//! Error types for the Gmail client.

use thiserror::Error;

/// Errors that can occur when talking to the Gmail API.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Gmail API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// The access token was rejected. Callers should treat this as fatal
    /// for the current user rather than retry.
    #[error("Gmail API rejected the access token (status {status})")]
    Unauthorized {
        /// HTTP status code (401 or 403).
        status: u16,
    },

    /// A response body did not match the expected wire model.
    #[error("failed to decode Gmail API response: {0}")]
    Json(#[from] serde_json::Error),

    /// A push-notification payload was malformed.
    #[error("invalid mailbox notification payload: {0}")]
    Notification(String),
}

impl Error {
    /// Whether this error indicates dead credentials.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
