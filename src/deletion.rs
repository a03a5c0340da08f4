//! User-initiated data deletion.
//!
//! Four steps, strictly in order:
//!
//! 1. delete the profile document (failure aborts)
//! 2. delete the stored photo (failure is logged, deletion continues)
//! 3. delete the locally cached photo (best effort)
//! 4. delete the auth account (failure aborts; earlier steps stay done)

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::Backend;
use crate::cache::ImageCache;
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::observer::{Observers, Subscription};

/// Step currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStep {
    /// Deleting the profile document.
    DeletingProfile,
    /// Deleting the stored photo.
    DeletingPhoto,
    /// Deleting the cached photo.
    ClearingCache,
    /// Deleting the auth account.
    DeletingAccount,
}

impl DeletionStep {
    /// Progress label shown while the step runs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DeletingProfile => "Deleting user profile...",
            Self::DeletingPhoto => "Deleting profile images...",
            Self::ClearingCache => "Clearing local cache...",
            Self::DeletingAccount => "Deleting authentication account...",
        }
    }
}

/// Outcome of a completed deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionReport {
    /// Whether the stored photo was deleted (it may not have existed).
    pub photo_deleted: bool,
    /// Whether a cached photo was removed.
    pub cache_cleared: bool,
}

/// Runs the deletion sequence for the signed-in user.
pub struct DataDeletion {
    backend: Backend,
    config: Arc<CoreConfig>,
    cache: ImageCache,
    progress: Observers<DeletionStep>,
}

impl DataDeletion {
    /// Creates the flow.
    #[must_use]
    pub fn new(backend: Backend, config: Arc<CoreConfig>, cache: ImageCache) -> Self {
        Self {
            backend,
            config,
            cache,
            progress: Observers::new(),
        }
    }

    /// Registers a callback invoked as each step starts.
    pub fn subscribe(
        &self,
        callback: impl Fn(&DeletionStep) + Send + Sync + 'static,
    ) -> Subscription {
        self.progress.subscribe(callback)
    }

    fn step(&self, step: DeletionStep) {
        info!(step = step.label(), "Data deletion step");
        self.progress.notify(&step);
    }

    /// Deletes everything belonging to the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] without a signed-in user, or
    /// [`CoreError::DeletionFailed`] if the document or account deletion
    /// fails.
    pub async fn execute(&self) -> Result<DeletionReport> {
        let user = self
            .backend
            .auth
            .current_user()
            .ok_or(CoreError::NotAuthenticated)?;
        let key = self.config.profile_key.for_user(&user);

        self.step(DeletionStep::DeletingProfile);
        self.backend
            .documents
            .delete(&self.config.users_collection, &key)
            .await
            .map_err(|err| CoreError::DeletionFailed {
                step: "user profile",
                message: err.message().to_string(),
            })?;

        self.step(DeletionStep::DeletingPhoto);
        let photo_deleted = match self
            .backend
            .objects
            .delete(&self.config.photo_path(&key))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, uid = %user.uid, "Photo deletion failed, continuing");
                false
            }
        };

        self.step(DeletionStep::ClearingCache);
        let cache_cleared = self.cache.remove(&user.uid);

        self.step(DeletionStep::DeletingAccount);
        self.backend
            .auth
            .delete_current_user()
            .await
            .map_err(|err| CoreError::DeletionFailed {
                step: "authentication account",
                message: err.message().to_string(),
            })?;

        info!(uid = %user.uid, photo_deleted, "User data deleted");
        Ok(DeletionReport {
            photo_deleted,
            cache_cleared,
        })
    }
}

impl std::fmt::Debug for DataDeletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataDeletion")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(DeletionStep::DeletingProfile.label(), "Deleting user profile...");
        assert_eq!(DeletionStep::DeletingPhoto.label(), "Deleting profile images...");
        assert_eq!(DeletionStep::ClearingCache.label(), "Clearing local cache...");
        assert_eq!(
            DeletionStep::DeletingAccount.label(),
            "Deleting authentication account..."
        );
    }
}
