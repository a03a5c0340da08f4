//! Error types for core operations.
//!
//! Every failure ends up as a message shown inline in the UI; the variants
//! exist so callers and logs can tell local validation apart from backend
//! failures.

use thiserror::Error;

use crate::backend::BackendError;

/// Error type for core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Phone number has too few digits.
    #[error("Phone number must have at least {min_digits} digits.")]
    InvalidPhoneNumber {
        /// Required digit count.
        min_digits: usize,
    },

    /// A code was requested too recently.
    #[error("Resend OTP in {remaining_secs}s")]
    ResendCooldown {
        /// Seconds until another request is allowed.
        remaining_secs: u64,
    },

    /// Code has the wrong number of digits.
    #[error("Enter the {length}-digit code.")]
    InvalidCode {
        /// Expected digit count.
        length: usize,
    },

    /// A code was submitted before one was sent.
    #[error("No verification code has been sent.")]
    NoVerificationPending,

    /// Event not valid in the current session state.
    #[error("Invalid session transition: {event} in {state}")]
    InvalidTransition {
        /// State name.
        state: &'static str,
        /// Event name.
        event: &'static str,
    },

    /// Operation needs a signed-in user.
    #[error("No authenticated user found.")]
    NotAuthenticated,

    /// Save attempted without a photo.
    #[error("Please select a profile image.")]
    MissingPhoto,

    /// Form contents are incomplete or invalid.
    #[error("{0}")]
    InvalidProfile(String),

    /// Backend call failed; shows the backend's message.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Local image cache failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A hard step of the data deletion sequence failed.
    #[error("Failed to delete {step}: {message}")]
    DeletionFailed {
        /// What was being deleted.
        step: &'static str,
        /// Backend message.
        message: String,
    },
}

impl CoreError {
    /// Returns the message to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
