//! Authentication error taxonomy.

use thiserror::Error;

/// Errors raised by the session manager and its collaborators.
///
/// The type is `Clone` and `Eq` because one failure is handed to every
/// caller attached to a shared in-flight operation, and because the last
/// failure is mirrored into [`SessionState::error`](crate::SessionState).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A required argument was missing or empty.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error description.
        message: String,
    },

    /// The identity provider's persisted token cache could not be parsed.
    #[error("token cache corrupted: {message}")]
    CacheCorrupted {
        /// Error description.
        message: String,
    },

    /// A persisted application cache entry could not be parsed.
    #[error("cache entry '{key}' could not be parsed: {message}")]
    CacheParse {
        /// Storage key of the offending entry.
        key: String,
        /// Error description.
        message: String,
    },

    /// Interactive or silent authentication was exhausted.
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Error description.
        message: String,
    },

    /// Silent acquisition is impossible and the user must interact.
    #[error("interaction required: {message}")]
    InteractionRequired {
        /// Error description.
        message: String,
    },

    /// An expected claim was absent from the identity token.
    #[error("missing claim: {claim}")]
    MissingClaim {
        /// Name of the claim.
        claim: String,
    },

    /// A remote call failed.
    #[error("network error: {message}")]
    NetworkError {
        /// Error description.
        message: String,
    },

    /// The key-value storage layer failed.
    #[error("storage error: {message}")]
    Storage {
        /// Error description.
        message: String,
    },

    /// The session manager was used before `init`.
    #[error("authentication has not been initialized")]
    NotInitialized,
}

impl AuthError {
    /// Shorthand for [`AuthError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`AuthError::AuthenticationFailed`].
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Shorthand for [`AuthError::NetworkError`].
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Shorthand for [`AuthError::Storage`].
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Shorthand for [`AuthError::MissingClaim`].
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim {
            claim: claim.into(),
        }
    }

    /// Returns true if the failure came from a corrupted provider token cache.
    #[must_use]
    pub const fn is_cache_corrupted(&self) -> bool {
        matches!(self, Self::CacheCorrupted { .. })
    }
}

/// Result type alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
