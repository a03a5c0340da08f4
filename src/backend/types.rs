//! Identifier and value types exchanged with the backend.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::profile::ProfileDocument;

/// Opaque user identifier issued by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a backend-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A phone number in `+<country code><national digits>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Builds an E.164-like number from a calling-code prefix and national digits.
    ///
    /// The prefix may be given with or without the leading `+`.
    ///
    /// # Examples
    ///
    /// ```
    /// use phoneid_core::backend::PhoneNumber;
    ///
    /// let phone = PhoneNumber::from_national("+1", "5551234567");
    /// assert_eq!(phone.as_str(), "+15551234567");
    /// ```
    #[must_use]
    pub fn from_national(calling_code: &str, digits: &str) -> Self {
        let code = calling_code.trim_start_matches('+');
        Self(format!("+{code}{digits}"))
    }

    /// Wraps an already formatted number as reported by the backend.
    #[must_use]
    pub fn new(formatted: impl Into<String>) -> Self {
        Self(formatted.into())
    }

    /// Returns the formatted number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle returned by the backend after it accepted a phone number.
///
/// Only meaningful to the backend that issued it; exchanged together with
/// the one-time code for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationHandle(String);

impl VerificationHandle {
    /// Wraps a backend-issued verification id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw verification id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque proof of authentication issued after phone verification.
///
/// The token bytes are zeroized on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionCredential {
    token: String,
}

impl SessionCredential {
    /// Wraps a backend-issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Exposes the raw token for handing back to the backend SDK.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The signed-in user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Stable user identifier.
    pub uid: UserId,
    /// Verified phone number.
    pub phone: PhoneNumber,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The user the credential belongs to.
    pub user: AuthUser,
    /// The issued credential.
    pub credential: SessionCredential,
}

/// One firing of a document listener.
///
/// Listeners typically fire once from the local cache (`from_cache`) and
/// again once the server confirmed the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Document contents, `None` if the document does not exist.
    pub profile: Option<ProfileDocument>,
    /// Whether this snapshot came from the local cache.
    pub from_cache: bool,
}

/// Which push gateway a device token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushEnvironment {
    /// Development gateway.
    #[default]
    Sandbox,
    /// Production gateway.
    Production,
}

/// Device push token, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushToken(String);

impl PushToken {
    /// Encodes raw device token bytes as lowercase hex.
    ///
    /// # Examples
    ///
    /// ```
    /// use phoneid_core::backend::PushToken;
    ///
    /// let token = PushToken::from_device_bytes(&[0xde, 0xad, 0xbe, 0xef]);
    /// assert_eq!(token.as_str(), "deadbeef");
    /// ```
    #[must_use]
    pub fn from_device_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Returns the hex-encoded token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
