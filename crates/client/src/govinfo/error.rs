//! GovInfo API client error types.

use std::sync::Arc;

use govsync_core::TransportError;
use reqwest::StatusCode;

/// Errors from the GovInfo API client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GovInfoError {
    /// No API key configured.
    #[error("missing API key: GOVSYNC_API_KEY not set")]
    MissingApiKey,

    /// Base URL cannot carry path segments.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GovInfoError {
    /// The request URL is stripped so errors stay safe to log.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { GovInfoError::Timeout } else { GovInfoError::Network(Arc::new(err.without_url())) }
    }
}

impl From<GovInfoError> for TransportError {
    fn from(err: GovInfoError) -> Self {
        match err {
            GovInfoError::MissingApiKey => TransportError::MissingApiKey,
            GovInfoError::AuthError => TransportError::Auth,
            GovInfoError::RateLimited => TransportError::RateLimited,
            GovInfoError::HttpError { status } => TransportError::Http { status },
            GovInfoError::Timeout => TransportError::Timeout,
            GovInfoError::Network(e) => TransportError::Network(e.to_string()),
            GovInfoError::InvalidBaseUrl(msg) => TransportError::Network(msg),
            GovInfoError::Parse(msg) => TransportError::Parse(msg),
        }
    }
}

/// Map a response status to an error, `Ok` for success codes.
pub fn check_status(status: StatusCode) -> Result<(), GovInfoError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GovInfoError::AuthError);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GovInfoError::RateLimited);
    }

    if status.is_client_error() || status.is_server_error() {
        return Err(GovInfoError::HttpError { status: status.as_u16() });
    }

    Ok(())
}
