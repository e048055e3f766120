use thiserror::Error;

/// Errors returned by the Leadscout backend client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The resource (prospect, post, brand) no longer exists server-side.
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("rate limited by backend (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}: {message}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        message: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl ClientError {
    /// Returns `true` for failures that may succeed when the same request is
    /// sent again: timeouts, connection failures, 429 and 5xx responses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            ClientError::RateLimited { .. } => true,
            ClientError::UnexpectedStatus { status, .. } => *status >= 500,
            ClientError::NotFound { .. }
            | ClientError::Deserialize { .. }
            | ClientError::InvalidBaseUrl { .. } => false,
        }
    }
}
