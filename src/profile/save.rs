//! Profile save: photo upload, then document write.

use std::sync::Arc;

use tracing::{info, warn};

use super::types::{ProfileDocument, ProfileDraft, ProfileUpdate};
use crate::backend::{AuthUser, Backend};
use crate::cache::ImageCache;
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};

/// Whether a save creates the profile or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMode {
    /// Writes the full document.
    Create,
    /// Updates the editable fields of `current`.
    Edit {
        /// Document as loaded before editing.
        current: ProfileDocument,
    },
}

/// Runs the upload-then-write sequence.
///
/// The photo is always uploaded first and the document is only written with
/// the URL of a completed upload, so a document never points at a photo that
/// failed to upload. A write failure after a successful upload leaves the
/// uploaded photo in place.
#[derive(Debug, Clone)]
pub struct ProfileSaver {
    backend: Backend,
    config: Arc<CoreConfig>,
    cache: ImageCache,
}

impl ProfileSaver {
    /// Creates a saver.
    #[must_use]
    pub const fn new(backend: Backend, config: Arc<CoreConfig>, cache: ImageCache) -> Self {
        Self {
            backend,
            config,
            cache,
        }
    }

    /// Saves `draft` for `user` and returns the resulting document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingPhoto`] without any backend call if the
    /// draft has no photo, otherwise the first failing backend call's error.
    pub async fn save(
        &self,
        user: &AuthUser,
        draft: &ProfileDraft,
        mode: &SaveMode,
    ) -> Result<ProfileDocument> {
        if draft.photo_jpeg.is_empty() {
            return Err(CoreError::MissingPhoto);
        }

        let key = self.config.profile_key.for_user(user);
        let path = self.config.photo_path(&key);
        let collection = &self.config.users_collection;

        self.backend.objects.put(&path, &draft.photo_jpeg).await?;
        let url = self.backend.objects.download_url(&path).await?;

        let document = match mode {
            SaveMode::Create => {
                let document = ProfileDocument::from_draft(user, draft, &url);
                self.backend
                    .documents
                    .set(collection, &key, &document)
                    .await
                    .inspect_err(|err| warn_orphaned_photo(&path, err))?;
                document
            }
            SaveMode::Edit { current } => {
                let update = ProfileUpdate::from_draft(draft, &url);
                self.backend
                    .documents
                    .update(collection, &key, &update)
                    .await
                    .inspect_err(|err| warn_orphaned_photo(&path, err))?;
                let mut document = current.clone();
                document.apply(&update);
                document
            }
        };

        info!(
            uid = %user.uid,
            username = %document.username,
            create = matches!(mode, SaveMode::Create),
            "Profile saved"
        );
        self.cache.store_best_effort(&user.uid, &draft.photo_jpeg);
        Ok(document)
    }

    /// Removes a newly created profile whose sign-up ended before the save
    /// was recorded, so its username is not left reserved.
    pub async fn discard_created(&self, user: &AuthUser) {
        let key = self.config.profile_key.for_user(user);
        let path = self.config.photo_path(&key);
        if let Err(err) = self
            .backend
            .documents
            .delete(&self.config.users_collection, &key)
            .await
        {
            warn!(error = %err, uid = %user.uid, "Failed to discard profile document");
        }
        if let Err(err) = self.backend.objects.delete(&path).await {
            warn!(error = %err, path, "Failed to discard profile photo");
        }
        self.cache.remove(&user.uid);
        info!(uid = %user.uid, "Discarded profile of ended sign-up");
    }
}

fn warn_orphaned_photo(path: &str, err: &crate::backend::BackendError) {
    warn!(error = %err, path, "Profile write failed after photo upload");
}
