use std::time::Duration;

/// Failures surfaced by provider clients, already normalized across backends.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Review, file, or revision does not exist (or the id is malformed).
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing entity.
        what: String,
    },
    /// Backend rejected the configured credentials.
    #[error("authentication failed: {message}")]
    AuthFailure {
        /// Backend-provided detail.
        message: String,
    },
    /// Network failure, timeout, or server-side error.
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        /// Transport or status detail.
        message: String,
    },
    /// Backend is throttling requests.
    #[error("rate limited{}", retry_hint(.retry_after))]
    RateLimited {
        /// Delay suggested by the backend before retrying.
        retry_after: Option<Duration>,
    },
    /// Settings could not be turned into a client.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong with the settings.
        message: String,
    },
    /// Backend payload could not be decoded.
    #[error("unexpected payload: {message}")]
    Serialization {
        /// Decoder detail.
        message: String,
    },
}

impl ProviderError {
    /// Helper for [`ProviderError::NotFound`].
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper for [`ProviderError::BackendUnavailable`].
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Helper for [`ProviderError::InvalidConfiguration`].
    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Helper for [`ProviderError::Serialization`].
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether a later identical request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. } | Self::RateLimited { .. }
        )
    }
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|delay| format!(", retry after {}s", delay.as_secs()))
        .unwrap_or_default()
}

/// Convenience result alias for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
