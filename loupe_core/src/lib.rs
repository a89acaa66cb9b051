//! Core library for Loupe's multi-provider review workflow.
//!
//! The crate is layered around four responsibilities:
//! - validating provider settings and holding the active provider set
//! - dispatching review requests to the matching provider client
//! - tracking which files of a review have been read
//! - bridging requests from the mobile UI through `UniFFI`

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Request bridge between the UI thread and provider round trips.
pub mod bridge;
/// Runtime configuration and environment overrides.
pub mod config;
/// `UniFFI` surface consumed by the mobile app.
pub mod ffi;
/// Dispatch façade over the registry and read-state tracker.
pub mod gateway;
/// Tracing subscriber setup.
pub mod logging;
/// Durable per-file read markers.
pub mod read_state;
/// Active provider set with atomic reconfiguration.
pub mod registry;
/// Provider settings validation.
pub mod settings;
/// Binary payload decoding for bridged operations.
pub mod wire;

use std::fmt;
use std::sync::PoisonError;

pub use bridge::{Bridge, Operation, Reply, ReplyPort, Response};
pub use config::CoreConfig;
use ffi::UniFfiTag;
pub use gateway::ReviewGateway;
pub use loupe_api::{
    ChangeType, ProviderKind, ProviderModule, ProviderSettings, Review, ReviewComment,
    ReviewDiscussion, ReviewFileChanges, ReviewFileDiscussion, ReviewFileSummary, ReviewState,
    User,
};
pub use loupe_provider_api::ProviderError;
pub use read_state::{ReadStateKey, ReadStateStore};
pub use registry::ProviderRegistry;
pub use settings::ConfigFailure;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No provider with this id is in the active set.
    #[error("provider is not configured: {provider}")]
    ProviderNotFound {
        /// Identifier that failed to resolve.
        provider: String,
    },
    /// A provider client failed to serve the request.
    #[error("provider {provider} failed: {source}")]
    Provider {
        /// Identifier of the provider that failed.
        provider: String,
        /// Error reported by the provider client.
        #[source]
        source: ProviderError,
    },
    /// Provider settings were rejected; the previous set stays active.
    #[error("invalid provider configuration: {}", list_failures(.failures))]
    InvalidConfiguration {
        /// Every rejected entry with its reason.
        failures: Vec<ConfigFailure>,
    },
    /// A bridged payload could not be decoded.
    #[error("malformed payload: {message}")]
    Serialization {
        /// Description of the decoding failure.
        message: String,
    },
    /// The read-state database failed.
    #[error("read-state storage error: {source}")]
    Storage {
        /// Original `SQLite` error.
        #[from]
        source: rusqlite::Error,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// Internal invariant failed.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

/// Classification shared by [`Error`] and the FFI error enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Provider, review, or file does not exist.
    NotFound,
    /// Credentials were rejected.
    AuthFailure,
    /// Backend is unreachable or failing.
    BackendUnavailable,
    /// Backend throttled the request.
    RateLimited,
    /// Settings or environment are invalid.
    InvalidConfiguration,
    /// A payload could not be decoded.
    Serialization,
    /// Local storage failed.
    Storage,
    /// Internal invariant failed.
    Internal,
}

impl Error {
    /// Classify the error for callers across the FFI boundary.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderNotFound { .. } => ErrorKind::NotFound,
            Self::Provider { source, .. } => match source {
                ProviderError::NotFound { .. } => ErrorKind::NotFound,
                ProviderError::AuthFailure { .. } => ErrorKind::AuthFailure,
                ProviderError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
                ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
                ProviderError::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
                ProviderError::Serialization { .. } => ErrorKind::Serialization,
            },
            Self::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Storage { .. } | Self::Io { .. } => ErrorKind::Storage,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Self::internal("lock poisoned")
    }
}

fn list_failures(failures: &[ConfigFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::AuthFailure => "authentication failed",
            Self::BackendUnavailable => "backend unavailable",
            Self::RateLimited => "rate limited",
            Self::InvalidConfiguration => "invalid configuration",
            Self::Serialization => "serialization error",
            Self::Storage => "storage error",
            Self::Internal => "internal error",
        };
        f.write_str(name)
    }
}
