//! Error types for the transport layer and the Reader API client.
//!
//! # Design
//! `TransportError` has exactly two kinds. `Configuration` is raised while a
//! transport is being built and is never fixed by retrying. `Communication`
//! is raised by a failed `post` and carries the native error code (OS errno,
//! libcurl code) when the layer underneath exposes one.
//!
//! `ApiError` wraps transport failures unchanged and adds the outcomes only
//! the API client can detect by reading a response body.

use thiserror::Error;

/// Errors returned by transport construction and `Transport::post`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend name is unknown, the configuration is invalid, or the
    /// backend's prerequisite is unavailable in this build.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connecting, sending, receiving or validating the response failed.
    #[error("{message}")]
    Communication { message: String, code: Option<i64> },
}

impl TransportError {
    pub fn configuration(message: impl Into<String>) -> Self {
        TransportError::Configuration(message.into())
    }

    pub fn communication(message: impl Into<String>) -> Self {
        TransportError::Communication {
            message: message.into(),
            code: None,
        }
    }

    pub fn communication_with_code(message: impl Into<String>, code: i64) -> Self {
        TransportError::Communication {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Build a communication error from an I/O failure, keeping the OS error
    /// number as the code.
    pub fn from_io(context: &str, err: &std::io::Error) -> Self {
        TransportError::Communication {
            message: format!("{context}: {err}"),
            code: err.raw_os_error().map(i64::from),
        }
    }

    /// Native error code, if the failing layer reported one.
    pub fn code(&self) -> Option<i64> {
        match self {
            TransportError::Communication { code, .. } => *code,
            TransportError::Configuration(_) => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, TransportError::Configuration(_))
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, TransportError::Communication { .. })
    }
}

/// Errors returned by `ReaderClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport failed; the inner error is passed through untouched.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// ClientLogin did not return an `Auth` value.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server answered, but not with what the operation expects.
    #[error("unexpected response from API server: {0}")]
    UnexpectedResponse(String),
}
