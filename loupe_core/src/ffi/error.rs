use thiserror::Error;

use crate::{Error, ErrorKind};

/// Errors surfaced through the `UniFFI` bindings.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// Provider, review, or file does not exist.
    #[error("not found")]
    NotFound,
    /// Backend rejected the credentials.
    #[error("authentication failed")]
    AuthFailure,
    /// Backend is unreachable or failing.
    #[error("backend unavailable")]
    BackendUnavailable,
    /// Backend throttled the request.
    #[error("rate limited")]
    RateLimited,
    /// Provider settings or environment are invalid.
    #[error("invalid configuration")]
    InvalidConfiguration,
    /// Payload could not be decoded.
    #[error("serialization error")]
    Serialization,
    /// Local storage failed.
    #[error("storage error")]
    Storage,
    /// Internal invariant failed.
    #[error("internal error")]
    Internal,
}

impl From<ErrorKind> for CoreError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::AuthFailure => Self::AuthFailure,
            ErrorKind::BackendUnavailable => Self::BackendUnavailable,
            ErrorKind::RateLimited => Self::RateLimited,
            ErrorKind::InvalidConfiguration => Self::InvalidConfiguration,
            ErrorKind::Serialization => Self::Serialization,
            ErrorKind::Storage => Self::Storage,
            ErrorKind::Internal => Self::Internal,
        }
    }
}

impl From<Error> for CoreError {
    fn from(error: Error) -> Self {
        tracing::debug!(%error, "request failed across the FFI boundary");
        error.kind().into()
    }
}
