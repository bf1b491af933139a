//! Error taxonomy for the TCC client.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TccError>;

/// All ways a request against the TCC cloud API can fail.
#[derive(Debug, Error)]
pub enum TccError {
    #[error("bad user credentials (status: {status:?})")]
    BadUserCredentials {
        status: Option<u16>,
        message: String,
    },

    #[error("authentication failed (status: {status:?}): {message}")]
    AuthenticationFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("rate limit exceeded (status: {status:?})")]
    RateLimitExceeded {
        status: Option<u16>,
        message: String,
    },

    #[error("api request failed (status: {status:?}): {message}")]
    ApiRequestFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("installation does not have exactly one control system")]
    NoSingleTcs,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cache io error: {0}")]
    Cache(#[source] std::io::Error),
}

impl TccError {
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        TccError::InvalidSchema {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        TccError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn api_request_failed(status: Option<u16>, message: impl Into<String>) -> Self {
        TccError::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    pub fn authentication_failed(status: Option<u16>, message: impl Into<String>) -> Self {
        TccError::AuthenticationFailed {
            status,
            message: message.into(),
        }
    }

    pub fn bad_user_credentials(status: Option<u16>, message: impl Into<String>) -> Self {
        TccError::BadUserCredentials {
            status,
            message: message.into(),
        }
    }

    pub fn rate_limit_exceeded(status: Option<u16>, message: impl Into<String>) -> Self {
        TccError::RateLimitExceeded {
            status,
            message: message.into(),
        }
    }

    /// HTTP status this error carries, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TccError::BadUserCredentials { status, .. }
            | TccError::AuthenticationFailed { status, .. }
            | TccError::RateLimitExceeded { status, .. }
            | TccError::ApiRequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accessor_extracts_from_relevant_variants() {
        let err = TccError::rate_limit_exceeded(Some(429), "slow down");
        assert_eq!(err.status(), Some(429));

        let err = TccError::NoSingleTcs;
        assert_eq!(err.status(), None);
    }
}
