//! Profile document types.

use serde::{Deserialize, Serialize};

use crate::backend::AuthUser;

/// The authoritative record of a user's display identity.
///
/// Stored in the users collection; field names match the stored document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileDocument {
    /// Owning user id.
    #[serde(default)]
    pub uid: String,
    /// First name (letters only).
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    /// Last name (letters only).
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    /// Lowercase, alphanumeric, globally unique.
    #[serde(default)]
    pub username: String,
    /// Verified phone number.
    #[serde(default)]
    pub phone: String,
    /// Download URL of the profile photo.
    #[serde(rename = "profileURL", default)]
    pub profile_url: String,
}

impl ProfileDocument {
    /// Builds a full document for `user` from a submitted draft and photo URL.
    #[must_use]
    pub fn from_draft(user: &AuthUser, draft: &ProfileDraft, profile_url: &str) -> Self {
        Self {
            uid: user.uid.as_str().to_string(),
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            username: draft.username.to_lowercase(),
            phone: user.phone.as_str().to_string(),
            profile_url: profile_url.to_string(),
        }
    }

    /// Returns true if the document carries no profile data.
    ///
    /// A document that exists but is empty is treated like a missing one
    /// when deciding whether the user still has to create a profile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_empty() && self.last_name.is_empty() && self.username.is_empty()
    }

    /// Applies an edit-flow update.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        self.first_name.clone_from(&update.first_name);
        self.last_name.clone_from(&update.last_name);
        self.username.clone_from(&update.username);
        self.profile_url.clone_from(&update.profile_url);
    }

    /// Serializes to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Fields written by the edit flow; `uid` and `phone` are never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New first name.
    #[serde(rename = "firstName")]
    pub first_name: String,
    /// New last name.
    #[serde(rename = "lastName")]
    pub last_name: String,
    /// New lowercase username.
    pub username: String,
    /// New photo URL.
    #[serde(rename = "profileURL")]
    pub profile_url: String,
}

impl ProfileUpdate {
    /// Builds an update from a submitted draft and photo URL.
    #[must_use]
    pub fn from_draft(draft: &ProfileDraft, profile_url: &str) -> Self {
        Self {
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            username: draft.username.to_lowercase(),
            profile_url: profile_url.to_string(),
        }
    }
}

/// A profile as submitted from the create/edit form.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Username as typed.
    pub username: String,
    /// JPEG-encoded photo.
    pub photo_jpeg: Vec<u8>,
}

impl std::fmt::Debug for ProfileDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileDraft")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("username", &self.username)
            .field("photo_jpeg", &format_args!("<{} bytes>", self.photo_jpeg.len()))
            .finish()
    }
}
