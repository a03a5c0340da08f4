//! Entry point for host applications.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{AuthUser, Backend, PushToken};
use crate::cache::ImageCache;
use crate::config::CoreConfig;
use crate::deletion::{DataDeletion, DeletionReport};
use crate::error::{CoreError, Result};
use crate::observer::Subscription;
use crate::profile::{
    ProfileDocument, ProfileEvent, ProfileForm, ProfileListener, ProfileSaver, SaveMode,
    UsernameChecker,
};
use crate::session::{AbandonReason, SessionController, SessionState};

/// Wires the controllers to one set of backend handles.
///
/// Screens talk to the controllers through this type; the shell forwards
/// lifecycle events (backgrounding, back navigation) to it.
pub struct PhoneIdCore {
    config: Arc<CoreConfig>,
    backend: Backend,
    cache: ImageCache,
    session: SessionController,
    saver: ProfileSaver,
    listener: ProfileListener,
    deletion: DataDeletion,
}

impl PhoneIdCore {
    /// Creates the core with photos cached under `cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if `config` is invalid.
    pub fn new(config: CoreConfig, backend: Backend, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let cache = ImageCache::new(cache_dir);
        Ok(Self {
            session: SessionController::new(backend.clone(), CoreConfig::clone(&config)),
            saver: ProfileSaver::new(backend.clone(), Arc::clone(&config), cache.clone()),
            listener: ProfileListener::new(backend.clone(), Arc::clone(&config), cache.clone()),
            deletion: DataDeletion::new(backend.clone(), Arc::clone(&config), cache.clone()),
            config,
            backend,
            cache,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Session controller.
    #[must_use]
    pub const fn session(&self) -> &SessionController {
        &self.session
    }

    /// Photo cache.
    #[must_use]
    pub const fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Deletion flow, for subscribing to its progress.
    #[must_use]
    pub const fn deletion(&self) -> &DataDeletion {
        &self.deletion
    }

    /// Reconciles the restored credential and starts following credential
    /// changes. Keep the returned subscription for the app's lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial profile lookup fails.
    pub async fn start(&self) -> Result<Subscription> {
        let watch = self.session.watch_auth_changes();
        self.session.bootstrap().await?;
        Ok(watch)
    }

    fn signed_in_user(&self) -> Result<AuthUser> {
        self.session
            .state()
            .user()
            .cloned()
            .ok_or(CoreError::NotAuthenticated)
    }

    // ==================== Profile ====================

    /// Form prefilled with the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] unless a profile is loaded.
    pub fn edit_form(&self) -> Result<ProfileForm> {
        match self.session.state() {
            SessionState::AuthenticatedWithProfile { profile, .. } => Ok(ProfileForm::edit(profile)),
            _ => Err(CoreError::NotAuthenticated),
        }
    }

    /// Availability checker for `form`'s username field.
    #[must_use]
    pub fn username_checker(&self, form: &ProfileForm) -> UsernameChecker {
        UsernameChecker::new(
            Arc::clone(&self.backend.documents),
            &self.config,
            form.original_username().map(str::to_string),
        )
    }

    /// Saves the form and records the result in the session.
    ///
    /// Leaving profile creation while the save runs is deferred until it
    /// finishes. If the session ended anyway (sign-out, revoked credential)
    /// a newly created profile is removed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is incomplete, nobody is signed in, or a
    /// backend call fails.
    pub async fn save_profile(&self, form: &ProfileForm) -> Result<ProfileDocument> {
        let draft = form.to_draft()?;
        let user = self.session.begin_profile_save()?;
        let document = match self.saver.save(&user, &draft, form.mode()).await {
            Ok(document) => document,
            Err(err) => {
                self.session.profile_save_failed().await;
                return Err(err);
            }
        };
        if let Err(err) = self.session.profile_saved(document.clone()) {
            warn!(error = %err, uid = %user.uid, "Session ended during profile save");
            if matches!(form.mode(), SaveMode::Create) {
                self.saver.discard_created(&user).await;
            }
            return Err(err);
        }
        Ok(document)
    }

    /// Streams the signed-in user's profile for the edit screen.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] if nobody is signed in.
    pub fn listen_profile(
        &self,
        callback: impl Fn(&ProfileEvent) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        let user = self.signed_in_user()?;
        Ok(self.listener.listen(&user, callback))
    }

    // ==================== Lifecycle ====================

    /// The app moved to the background.
    ///
    /// # Errors
    ///
    /// Returns an error if an incomplete sign-up could not be deleted.
    pub async fn app_backgrounded(&self) -> Result<bool> {
        self.session
            .abandon_profile_creation(AbandonReason::Backgrounded)
            .await
    }

    /// The user navigated back from the create-profile screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the incomplete sign-up could not be deleted.
    pub async fn navigated_back(&self) -> Result<bool> {
        self.session
            .abandon_profile_creation(AbandonReason::NavigatedBack)
            .await
    }

    /// Signs out.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to sign out.
    pub async fn sign_out(&self) -> Result<()> {
        self.session.sign_out().await
    }

    /// Deletes all of the user's data, then returns to sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile document or the account could not be
    /// deleted.
    pub async fn delete_account_data(&self) -> Result<DeletionReport> {
        let report = self.deletion.execute().await?;
        self.session.data_deleted();
        Ok(report)
    }

    // ==================== Push ====================

    /// Forwards a device push token to the auth backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the token.
    pub async fn register_push_token(&self, device_token: &[u8]) -> Result<PushToken> {
        let token = PushToken::from_device_bytes(device_token);
        let environment = self.config.push_environment;
        debug!(?environment, "Registering push token");
        self.backend
            .auth
            .register_push_token(&token, environment)
            .await?;
        info!(?environment, "Push token registered");
        Ok(token)
    }
}

impl std::fmt::Debug for PhoneIdCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneIdCore")
            .field("session", &self.session)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
