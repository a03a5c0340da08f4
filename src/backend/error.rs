//! Error type reported by backend implementations.
//!
//! The managed backend reports failures as localized, human-readable
//! messages. Implementations map them into one of a few coarse kinds so
//! callers can log them, but the UI only ever shows the message.

use thiserror::Error;

/// Errors returned by [`AuthBackend`], [`DocumentStore`] and [`ObjectStorage`].
///
/// [`AuthBackend`]: super::AuthBackend
/// [`DocumentStore`]: super::DocumentStore
/// [`ObjectStorage`]: super::ObjectStorage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend refused the request (wrong code, expired handle, permission denied).
    #[error("{0}")]
    Rejected(String),

    /// The addressed document, object or user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The backend could not be reached or failed internally.
    #[error("{0}")]
    Unavailable(String),
}

impl BackendError {
    /// Returns the backend's human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected(msg) | Self::NotFound(msg) | Self::Unavailable(msg) => msg,
        }
    }

    /// Returns a short label for structured logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
