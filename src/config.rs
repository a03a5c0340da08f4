//! Core configuration.
//!
//! Every tunable of the sign-up flow lives in [`CoreConfig`]. The host app
//! usually ships a JSON blob; any omitted field keeps its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{AuthUser, PushEnvironment};
use crate::error::{CoreError, Result};

/// Which identifier keys profile documents and photo objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKey {
    /// Stable user id issued by the auth backend.
    #[default]
    UserId,
    /// Verified phone number. Phone numbers can be reassigned; only for legacy data.
    PhoneNumber,
}

impl ProfileKey {
    /// Returns the key for `user`.
    #[must_use]
    pub fn for_user(self, user: &AuthUser) -> String {
        match self {
            Self::UserId => user.uid.as_str().to_string(),
            Self::PhoneNumber => user.phone.as_str().to_string(),
        }
    }
}

/// Configuration for all controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Calling-code prefix prepended to the national number, e.g. `+1`.
    pub country_calling_code: String,
    /// Minimum digits before a code can be requested.
    pub min_phone_digits: usize,
    /// Digits in the one-time code.
    pub verification_code_length: usize,
    /// Seconds before another code may be requested.
    pub resend_cooldown_secs: u64,
    /// Minimum username length.
    pub username_min_length: usize,
    /// Settle delay before a username is checked.
    pub username_debounce_ms: u64,
    /// Largest photo downloaded for the edit screen.
    pub photo_max_download_bytes: usize,
    /// Collection holding profile documents.
    pub users_collection: String,
    /// Storage folder holding profile photos.
    pub storage_prefix: String,
    /// Identifier used for document and object keys.
    pub profile_key: ProfileKey,
    /// Push gateway the device token belongs to.
    pub push_environment: PushEnvironment,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            country_calling_code: "+1".to_string(),
            min_phone_digits: 10,
            verification_code_length: 6,
            resend_cooldown_secs: 30,
            username_min_length: 4,
            username_debounce_ms: 500,
            photo_max_download_bytes: 5 * 1024 * 1024,
            users_collection: "users".to_string(),
            storage_prefix: "profiles".to_string(),
            profile_key: ProfileKey::UserId,
            push_environment: PushEnvironment::Sandbox,
        }
    }
}

impl CoreConfig {
    /// Parses a JSON configuration and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the JSON is malformed or invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use phoneid_core::CoreConfig;
    ///
    /// let config = CoreConfig::from_json(r#"{"country_calling_code": "+44"}"#).unwrap();
    /// assert_eq!(config.country_calling_code, "+44");
    /// assert_eq!(config.min_phone_digits, 10);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let code = self.country_calling_code.trim_start_matches('+');
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Config(format!(
                "country_calling_code must be digits, got {:?}",
                self.country_calling_code
            )));
        }
        if self.min_phone_digits == 0 {
            return Err(CoreError::Config(
                "min_phone_digits must be positive".to_string(),
            ));
        }
        if self.verification_code_length == 0 {
            return Err(CoreError::Config(
                "verification_code_length must be positive".to_string(),
            ));
        }
        if self.username_min_length == 0 {
            return Err(CoreError::Config(
                "username_min_length must be positive".to_string(),
            ));
        }
        if self.users_collection.is_empty() || self.storage_prefix.is_empty() {
            return Err(CoreError::Config(
                "users_collection and storage_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Debounce delay as a [`Duration`].
    #[must_use]
    pub const fn username_debounce(&self) -> Duration {
        Duration::from_millis(self.username_debounce_ms)
    }

    /// Storage path of the profile photo for `key`.
    #[must_use]
    pub fn photo_path(&self, key: &str) -> String {
        format!("{}/{key}.jpg", self.storage_prefix)
    }
}
