// --- File: crates/notifly_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared by the Notifly crates.
///
/// Component crates keep their own error enums and convert into this one
/// where they meet shared plumbing (HTTP helpers, session wiring).
#[derive(Error, Debug)]
pub enum NotiflyError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// The server rejected the bearer token
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// The server answered with a non-success status
    #[error("External service error: {service_name} - {status}: {message}")]
    ExternalServiceError {
        service_name: String,
        status: u16,
        message: String,
    },

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Error occurred due to a timeout
    #[error("Timeout: {0}")]
    TimeoutError(String),
}

impl From<reqwest::Error> for NotiflyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotiflyError::TimeoutError(err.to_string())
        } else if err.is_decode() {
            NotiflyError::ParseError(err.to_string())
        } else {
            NotiflyError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NotiflyError {
    fn from(err: serde_json::Error) -> Self {
        NotiflyError::ParseError(err.to_string())
    }
}

pub fn external_service_error<T: fmt::Display>(
    service_name: &str,
    status: u16,
    message: T,
) -> NotiflyError {
    NotiflyError::ExternalServiceError {
        service_name: service_name.to_string(),
        status,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_service_error_message() {
        let err = external_service_error("notifications", 503, "down");
        assert_eq!(
            err.to_string(),
            "External service error: notifications - 503: down"
        );
    }

    #[test]
    fn test_json_error_is_parse_error() {
        let err: NotiflyError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, NotiflyError::ParseError(_)));
    }
}
