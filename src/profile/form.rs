//! Create/edit profile form state.

use rand::Rng;

use super::save::SaveMode;
use super::types::{ProfileDocument, ProfileDraft};
use super::username::{sanitize_name, suggest_username, UsernameStatus};
use crate::error::{CoreError, Result};

/// Field values of the profile form.
///
/// Name fields only ever hold letters; anything else is dropped as it is
/// entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileForm {
    first_name: String,
    last_name: String,
    username: String,
    photo_jpeg: Option<Vec<u8>>,
    mode: SaveMode,
}

impl ProfileForm {
    /// Empty form for first-time profile creation.
    #[must_use]
    pub const fn create() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            username: String::new(),
            photo_jpeg: None,
            mode: SaveMode::Create,
        }
    }

    /// Form prefilled from an existing document.
    ///
    /// The photo starts empty; the shell fills it from the cache or the
    /// stored object.
    #[must_use]
    pub fn edit(current: ProfileDocument) -> Self {
        Self {
            first_name: current.first_name.clone(),
            last_name: current.last_name.clone(),
            username: current.username.to_lowercase(),
            photo_jpeg: None,
            mode: SaveMode::Edit { current },
        }
    }

    /// Sets the first name, keeping letters only.
    pub fn set_first_name(&mut self, raw: &str) {
        self.first_name = sanitize_name(raw);
    }

    /// Sets the last name, keeping letters only.
    pub fn set_last_name(&mut self, raw: &str) {
        self.last_name = sanitize_name(raw);
    }

    /// Sets the username as typed.
    pub fn set_username(&mut self, raw: &str) {
        raw.clone_into(&mut self.username);
    }

    /// Sets the JPEG photo.
    pub fn set_photo(&mut self, jpeg: Vec<u8>) {
        self.photo_jpeg = Some(jpeg);
    }

    /// First name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Last name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Username as typed.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether a photo is set.
    #[must_use]
    pub const fn has_photo(&self) -> bool {
        self.photo_jpeg.is_some()
    }

    /// Save mode for this form.
    #[must_use]
    pub const fn mode(&self) -> &SaveMode {
        &self.mode
    }

    /// Username the edit flow started with.
    #[must_use]
    pub fn original_username(&self) -> Option<&str> {
        match &self.mode {
            SaveMode::Create => None,
            SaveMode::Edit { current } => Some(&current.username),
        }
    }

    /// Whether the save action is enabled.
    #[must_use]
    pub fn is_valid(&self, username_status: &UsernameStatus) -> bool {
        !self.first_name.is_empty()
            && !self.last_name.is_empty()
            && !self.username.is_empty()
            && self.has_photo()
            && username_status.is_available()
    }

    /// Username suggestion from the current names.
    pub fn suggestion<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        suggest_username(&self.first_name, &self.last_name, rng)
    }

    /// Builds the draft to save.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingPhoto`] without a photo and
    /// [`CoreError::InvalidProfile`] if a text field is empty.
    pub fn to_draft(&self) -> Result<ProfileDraft> {
        let photo_jpeg = self.photo_jpeg.clone().ok_or(CoreError::MissingPhoto)?;
        if self.first_name.is_empty() || self.last_name.is_empty() || self.username.is_empty() {
            return Err(CoreError::InvalidProfile(
                "Please fill in all required fields.".to_string(),
            ));
        }
        Ok(ProfileDraft {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            photo_jpeg,
        })
    }
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self::create()
    }
}
