//! Session controller: drives the state machine with backend calls.
//!
//! The controller is the single owner of the session state. Backend
//! outcomes are turned into [`SessionEvent`]s, applied through
//! [`SessionState::apply`] and published to subscribers as a
//! [`SessionSnapshot`].
//!
//! # Reconciliation
//!
//! Whenever the backend reports a credential change (sign-in, restore on
//! relaunch, revocation) the controller looks up the profile document and
//! routes to `AuthenticatedNoProfile` or `AuthenticatedWithProfile`. Each
//! lookup carries a generation number; a lookup that finishes after a newer
//! one started, or after a profile save / sign-out, is discarded.
//!
//! # Threading
//!
//! Subscriber callbacks run on whichever task completed the backend call.
//! Shells that need the UI thread must hop there inside the callback.

#![allow(clippy::significant_drop_tightening)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::input::{national_digits, sanitize_code, ResendCooldown};
use super::state::{SessionEvent, SessionState};
use crate::backend::{AuthUser, Backend, PhoneNumber};
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::observer::{Observers, Subscription};
use crate::profile::ProfileDocument;

/// What subscribers see after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionState,
    /// Message of the last failed operation, cleared on the next success.
    pub error: Option<String>,
}

/// Why profile creation was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// User navigated back from the create-profile screen.
    NavigatedBack,
    /// App moved to the background.
    Backgrounded,
}

struct Shared {
    state: SessionState,
    error: Option<String>,
    cooldown: ResendCooldown,
    /// A profile save is between upload and document write.
    saving: bool,
    /// Abandonment requested while `saving`.
    deferred_abandon: Option<AbandonReason>,
}

fn snapshot_of(shared: &Shared) -> SessionSnapshot {
    SessionSnapshot {
        state: shared.state.clone(),
        error: shared.error.clone(),
    }
}

struct Inner {
    backend: Backend,
    config: CoreConfig,
    shared: Mutex<Shared>,
    observers: Observers<SessionSnapshot>,
    generation: AtomicU64,
}

/// Owner of the session state machine.
///
/// Cloning yields another handle to the same session.
///
/// # Example
///
/// ```ignore
/// let session = SessionController::new(backend, CoreConfig::default());
/// let _watch = session.watch_auth_changes();
/// session.bootstrap().await?;
///
/// session.submit_phone_number("5551234567").await?;
/// session.submit_code("123456").await?;
/// ```
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Creates a controller in `Unauthenticated`.
    #[must_use]
    pub fn new(backend: Backend, config: CoreConfig) -> Self {
        let cooldown = ResendCooldown::new(config.resend_cooldown_secs);
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                shared: Mutex::new(Shared {
                    state: SessionState::Unauthenticated,
                    error: None,
                    cooldown,
                    saving: false,
                    deferred_abandon: None,
                }),
                observers: Observers::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Observation ====================

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Returns the message of the last failure, if not cleared since.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Returns state and error together.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        snapshot_of(&self.lock())
    }

    /// Registers a callback invoked after every state or error change.
    pub fn subscribe(
        &self,
        callback: impl Fn(&SessionSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.observers.subscribe(callback)
    }

    /// Clears the displayed error.
    pub fn clear_error(&self) {
        let snapshot = {
            let mut shared = self.lock();
            if shared.error.take().is_none() {
                return;
            }
            SessionSnapshot {
                state: shared.state.clone(),
                error: None,
            }
        };
        self.inner.observers.notify(&snapshot);
    }

    /// Records `err` as the displayed message and hands it back.
    fn fail(&self, err: CoreError) -> CoreError {
        let snapshot = {
            let mut shared = self.lock();
            shared.error = Some(err.user_message());
            snapshot_of(&shared)
        };
        self.inner.observers.notify(&snapshot);
        err
    }

    fn apply(&self, event: &SessionEvent) -> Result<SessionState> {
        self.apply_checked(event, None)
    }

    /// Applies `event`, skipping it if `generation` is given and stale.
    fn apply_checked(&self, event: &SessionEvent, generation: Option<u64>) -> Result<SessionState> {
        let (snapshot, from) = {
            let mut shared = self.lock();
            if let Some(generation) = generation {
                if generation != self.inner.generation.load(Ordering::SeqCst) {
                    debug!(event = event.name(), "Discarding stale reconciliation");
                    return Ok(shared.state.clone());
                }
            }
            let from = shared.state.name();
            let next = shared.state.clone().apply(event)?;
            shared.state = next;
            if !matches!(
                event,
                SessionEvent::CodeRequestFailed | SessionEvent::VerificationFailed
            ) {
                shared.error = None;
            }
            (snapshot_of(&shared), from)
        };
        info!(
            from,
            to = snapshot.state.name(),
            event = event.name(),
            "Session transition"
        );
        self.inner.observers.notify(&snapshot);
        Ok(snapshot.state)
    }

    /// Applies an event whose target may already have been reached by a
    /// concurrent reconciliation.
    fn apply_if_valid(&self, event: &SessionEvent) -> SessionState {
        match self.apply(event) {
            Ok(state) => state,
            Err(err) => {
                debug!(error = %err, "Transition already superseded");
                self.state()
            }
        }
    }

    /// Invalidates in-flight reconciliations.
    fn supersede_reconciliation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ==================== Phone Verification ====================

    /// Returns whether the send-code action is enabled for `input`.
    #[must_use]
    pub fn can_send_code(&self, input: &str) -> bool {
        let config = &self.inner.config;
        national_digits(input, &config.country_calling_code).len() >= config.min_phone_digits
            && self.resend_remaining_secs().is_none()
    }

    /// Seconds until another code may be requested.
    #[must_use]
    pub fn resend_remaining_secs(&self) -> Option<u64> {
        self.lock().cooldown.remaining_secs(Utc::now())
    }

    /// Returns whether the verify action is enabled for `input`.
    #[must_use]
    pub fn can_verify_code(&self, input: &str) -> bool {
        self.state().is_verification_sent()
            && sanitize_code(input, self.inner.config.verification_code_length).len()
                == self.inner.config.verification_code_length
    }

    /// Requests a one-time code for a national phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is too short, a resend cooldown is
    /// running, or the backend refuses the number (state returns to
    /// `Unauthenticated`).
    pub async fn submit_phone_number(&self, input: &str) -> Result<()> {
        let config = &self.inner.config;
        let digits = national_digits(input, &config.country_calling_code);
        if digits.len() < config.min_phone_digits {
            return Err(self.fail(CoreError::InvalidPhoneNumber {
                min_digits: config.min_phone_digits,
            }));
        }
        if let Some(remaining_secs) = self.resend_remaining_secs() {
            return Err(self.fail(CoreError::ResendCooldown { remaining_secs }));
        }

        let phone = PhoneNumber::from_national(&config.country_calling_code, &digits);
        self.apply(&SessionEvent::PhoneSubmitted(phone.clone()))
            .map_err(|e| self.fail(e))?;

        match self.inner.backend.auth.request_verification(&phone).await {
            Ok(handle) => {
                self.lock().cooldown.start(Utc::now());
                self.apply(&SessionEvent::CodeSent(handle))
                    .map_err(|e| self.fail(e))?;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "Verification request failed");
                self.apply_if_valid(&SessionEvent::CodeRequestFailed);
                Err(self.fail(err.into()))
            }
        }
    }

    /// Exchanges the entered code for a session and reconciles.
    ///
    /// # Errors
    ///
    /// Returns an error if no code was sent, the code is incomplete, or the
    /// backend rejects it (state stays `AwaitingVerification`).
    pub async fn submit_code(&self, input: &str) -> Result<SessionState> {
        let length = self.inner.config.verification_code_length;
        let SessionState::AwaitingVerification { handle, .. } = self.state() else {
            return Err(self.fail(CoreError::NoVerificationPending));
        };
        let code = sanitize_code(input, length);
        if code.len() != length {
            return Err(self.fail(CoreError::InvalidCode { length }));
        }

        match self.inner.backend.auth.verify_code(&handle, &code).await {
            Ok(session) => {
                info!(uid = %session.user.uid, "Phone verified");
                self.reconcile(Some(session.user)).await
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "Code verification failed");
                self.apply_if_valid(&SessionEvent::VerificationFailed);
                Err(self.fail(err.into()))
            }
        }
    }

    // ==================== Reconciliation ====================

    /// Reconciles the credential cached by the backend (app launch).
    ///
    /// # Errors
    ///
    /// Returns an error if the profile lookup fails.
    pub async fn bootstrap(&self) -> Result<SessionState> {
        let user = self.inner.backend.auth.current_user();
        debug!(signed_in = user.is_some(), "Bootstrapping session");
        self.reconcile(user).await
    }

    /// Re-runs reconciliation on every credential change reported by the
    /// backend until the returned subscription is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch_auth_changes(&self) -> Subscription {
        let mut changes = self.inner.backend.auth.auth_state_changes();
        let controller = self.clone();
        let task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let user = changes.borrow_and_update().clone();
                if let Err(err) = controller.reconcile(user).await {
                    warn!(error = %err, "Reconciliation after credential change failed");
                }
            }
        });
        Subscription::from_task(task)
    }

    /// Routes according to the credential and its profile document.
    ///
    /// `None` signs the session out unless it is still before verification.
    /// A document that is missing or empty routes to profile creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile lookup fails; the state is left
    /// unchanged.
    pub async fn reconcile(&self, user: Option<AuthUser>) -> Result<SessionState> {
        let generation = self.supersede_reconciliation();
        let Some(user) = user else {
            if self.state().user().is_none() {
                return Ok(self.state());
            }
            return self.apply_checked(&SessionEvent::SignedOut, Some(generation));
        };

        let config = &self.inner.config;
        let key = config.profile_key.for_user(&user);
        let lookup = self
            .inner
            .backend
            .documents
            .get(&config.users_collection, &key)
            .await;

        match lookup {
            Ok(document) => {
                let profile = document.filter(|doc| !doc.is_empty());
                debug!(uid = %user.uid, has_profile = profile.is_some(), "Profile lookup finished");
                self.apply_checked(&SessionEvent::Reconciled { user, profile }, Some(generation))
            }
            Err(err) => {
                warn!(error = %err, uid = %user.uid, "Profile lookup failed");
                if generation != self.inner.generation.load(Ordering::SeqCst) {
                    return Ok(self.state());
                }
                Err(self.fail(err.into()))
            }
        }
    }

    // ==================== Profile Lifecycle ====================

    /// Marks a profile save as running and returns the user it saves for.
    ///
    /// Until [`profile_saved`](Self::profile_saved) or
    /// [`profile_save_failed`](Self::profile_save_failed) is called,
    /// abandonment of the sign-up is deferred.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAuthenticated`] if nobody is signed in.
    pub fn begin_profile_save(&self) -> Result<AuthUser> {
        let mut shared = self.lock();
        let user = shared
            .state
            .user()
            .cloned()
            .ok_or(CoreError::NotAuthenticated)?;
        shared.saving = true;
        Ok(user)
    }

    /// Records a successful profile save.
    ///
    /// A completed sign-up drops any deferred abandonment.
    ///
    /// # Errors
    ///
    /// Returns an error if no user is signed in.
    pub fn profile_saved(&self, profile: ProfileDocument) -> Result<SessionState> {
        {
            let mut shared = self.lock();
            shared.saving = false;
            if let Some(reason) = shared.deferred_abandon.take() {
                debug!(?reason, "Sign-up completed; dropping deferred abandonment");
            }
        }
        self.supersede_reconciliation();
        self.apply(&SessionEvent::ProfileSaved(profile))
    }

    /// Records a failed profile save and runs an abandonment requested while
    /// it was running. Returns whether the account was deleted.
    pub async fn profile_save_failed(&self) -> bool {
        let deferred = {
            let mut shared = self.lock();
            shared.saving = false;
            shared.deferred_abandon.take()
        };
        let Some(reason) = deferred else {
            return false;
        };
        match self.abandon_profile_creation(reason).await {
            Ok(abandoned) => abandoned,
            Err(err) => {
                warn!(error = %err, ?reason, "Deferred abandonment failed");
                false
            }
        }
    }

    /// Deletes an incomplete sign-up when the user leaves profile creation.
    ///
    /// The account is deleted rather than signed out so that no
    /// authenticated-but-profile-less account survives a restart. Returns
    /// `false` without touching the backend unless the state is
    /// `AuthenticatedNoProfile`. While a profile save is running the request
    /// is deferred until it finishes, and `false` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the account deletion fails; the state is left
    /// unchanged.
    pub async fn abandon_profile_creation(&self, reason: AbandonReason) -> Result<bool> {
        {
            let mut shared = self.lock();
            if !matches!(shared.state, SessionState::AuthenticatedNoProfile { .. }) {
                return Ok(false);
            }
            if shared.saving {
                info!(?reason, "Profile save running; deferring abandonment");
                shared.deferred_abandon = Some(reason);
                return Ok(false);
            }
        }
        info!(?reason, "Abandoning incomplete sign-up");

        if let Err(err) = self.inner.backend.auth.delete_current_user().await {
            warn!(error = %err, ?reason, "Failed to delete abandoned account");
            return Err(self.fail(err.into()));
        }
        self.supersede_reconciliation();
        self.apply_if_valid(&SessionEvent::Abandoned);
        self.lock().cooldown.reset();
        Ok(true)
    }

    /// Signs out, keeping account and profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to clear the credential.
    pub async fn sign_out(&self) -> Result<()> {
        if let Err(err) = self.inner.backend.auth.sign_out().await {
            warn!(error = %err, "Sign-out failed");
            return Err(self.fail(err.into()));
        }
        self.supersede_reconciliation();
        self.apply(&SessionEvent::SignedOut)?;
        self.lock().cooldown.reset();
        Ok(())
    }

    /// Records completion of the data-deletion flow.
    pub fn data_deleted(&self) {
        self.supersede_reconciliation();
        self.apply_if_valid(&SessionEvent::SignedOut);
        self.lock().cooldown.reset();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state().name())
            .finish_non_exhaustive()
    }
}
