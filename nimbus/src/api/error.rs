use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Authentication failed, check the service account token")]
    AuthError,

    #[error("API returned error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable (HTTP {status}), retry later")]
    ServiceUnavailable { status: u16 },

    #[error("Timed out waiting for {what} after {secs} seconds")]
    WaitTimeout { what: String, secs: u64 },

    #[error("Gave up waiting for {what}, terminal state {state}")]
    WaitFailed { what: String, state: String },
}

impl ApiError {
    /// True when the error means the remote object does not exist, which
    /// reads translate into removing the resource from state.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}
