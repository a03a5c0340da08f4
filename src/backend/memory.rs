//! In-memory backend for tests and local development.
//!
//! [`InMemoryBackend`] implements all three backend traits against plain
//! maps. Failures and latency can be injected per [`Operation`], and every
//! call is counted so tests can assert that a query was (or was not) made.
//!
//! # Warning
//!
//! Nothing here is persisted or secured. Only available with the
//! `test-utils` feature.

#![allow(clippy::significant_drop_tightening)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

use super::error::{BackendError, BackendResult};
use super::traits::{AuthBackend, DocumentStore, ObjectStorage};
use super::types::{
    AuthSession, AuthUser, DocumentSnapshot, PhoneNumber, PushEnvironment, PushToken,
    SessionCredential, UserId, VerificationHandle,
};
use crate::profile::{ProfileDocument, ProfileUpdate};

/// Code accepted by [`InMemoryBackend`] unless changed.
pub const DEFAULT_TEST_CODE: &str = "123456";

/// URL scheme used for download URLs.
const URL_SCHEME: &str = "memory://";

/// Backend operations that can be failed, delayed and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `AuthBackend::request_verification`
    RequestVerification,
    /// `AuthBackend::verify_code`
    VerifyCode,
    /// `AuthBackend::sign_out`
    SignOut,
    /// `AuthBackend::delete_current_user`
    DeleteUser,
    /// `AuthBackend::register_push_token`
    RegisterPushToken,
    /// `DocumentStore::get`
    GetDocument,
    /// `DocumentStore::set`
    SetDocument,
    /// `DocumentStore::update`
    UpdateDocument,
    /// `DocumentStore::delete`
    DeleteDocument,
    /// `DocumentStore::find_by_username`
    QueryUsername,
    /// `DocumentStore::listen`
    Listen,
    /// `ObjectStorage::put`
    PutObject,
    /// `ObjectStorage::download_url`
    DownloadUrl,
    /// `ObjectStorage::fetch`
    FetchObject,
    /// `ObjectStorage::delete`
    DeleteObject,
}

#[derive(Default)]
struct MemoryState {
    code: String,
    next_handle: u64,
    handles: HashMap<String, PhoneNumber>,
    accounts: HashMap<PhoneNumber, UserId>,
    documents: HashMap<(String, String), ProfileDocument>,
    objects: HashMap<String, Vec<u8>>,
    push_tokens: Vec<(PushToken, PushEnvironment)>,
    failures: HashSet<Operation>,
    latency: HashMap<Operation, Duration>,
    calls: HashMap<Operation, usize>,
    listener_script: Option<Vec<DocumentSnapshot>>,
}

/// In-memory implementation of [`AuthBackend`], [`DocumentStore`] and
/// [`ObjectStorage`].
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    current: watch::Sender<Option<AuthUser>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Creates an empty backend accepting [`DEFAULT_TEST_CODE`].
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            state: Mutex::new(MemoryState {
                code: DEFAULT_TEST_CODE.to_string(),
                ..MemoryState::default()
            }),
            current,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only happens after a test already panicked.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Counts the call, waits for injected latency and applies injected failures.
    async fn simulate(&self, op: Operation) -> BackendResult<()> {
        let (delay, failing) = {
            let mut state = self.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            (state.latency.get(&op).copied(), state.failures.contains(&op))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(BackendError::Unavailable(format!(
                "Simulated failure: {op:?}"
            )));
        }
        Ok(())
    }

    /// Returns the user id that verifying `phone` yields.
    #[must_use]
    pub fn uid_for(phone: &PhoneNumber) -> UserId {
        UserId::new(format!("uid-{}", phone.as_str().trim_start_matches('+')))
    }

    // ==================== Test Controls ====================

    /// Makes every future call of `op` fail.
    pub fn fail(&self, op: Operation) {
        self.lock().failures.insert(op);
    }

    /// Stops failing `op`.
    pub fn recover(&self, op: Operation) {
        self.lock().failures.remove(&op);
    }

    /// Delays every future call of `op`.
    pub fn set_latency(&self, op: Operation, delay: Duration) {
        self.lock().latency.insert(op, delay);
    }

    /// Returns how many times `op` was called.
    #[must_use]
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Changes the accepted verification code.
    pub fn set_code(&self, code: &str) {
        self.lock().code = code.to_string();
    }

    /// Inserts a document directly.
    pub fn seed_document(&self, collection: &str, key: &str, profile: ProfileDocument) {
        self.lock()
            .documents
            .insert((collection.to_string(), key.to_string()), profile);
    }

    /// Returns a stored document.
    #[must_use]
    pub fn document(&self, collection: &str, key: &str) -> Option<ProfileDocument> {
        self.lock()
            .documents
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }

    /// Inserts an object directly.
    pub fn seed_object(&self, path: &str, bytes: Vec<u8>) {
        self.lock().objects.insert(path.to_string(), bytes);
    }

    /// Returns a stored object.
    #[must_use]
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(path).cloned()
    }

    /// Returns whether an account exists for `phone`.
    #[must_use]
    pub fn has_account(&self, phone: &PhoneNumber) -> bool {
        self.lock().accounts.contains_key(phone)
    }

    /// Returns all forwarded push tokens.
    #[must_use]
    pub fn push_tokens(&self) -> Vec<(PushToken, PushEnvironment)> {
        self.lock().push_tokens.clone()
    }

    /// Simulates a credential restored from a previous launch (or created elsewhere).
    pub fn restore_session(&self, phone: &PhoneNumber) -> AuthUser {
        let user = {
            let mut state = self.lock();
            let uid = state
                .accounts
                .entry(phone.clone())
                .or_insert_with(|| Self::uid_for(phone))
                .clone();
            AuthUser {
                uid,
                phone: phone.clone(),
            }
        };
        self.current.send_replace(Some(user.clone()));
        user
    }

    /// Simulates the backend terminating the session (revoked credential).
    pub fn revoke_session(&self) {
        self.current.send_replace(None);
    }

    /// Replaces the snapshots produced by the next `listen` calls.
    pub fn script_listener(&self, snapshots: Vec<DocumentSnapshot>) {
        self.lock().listener_script = Some(snapshots);
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn request_verification(
        &self,
        phone: &PhoneNumber,
    ) -> BackendResult<VerificationHandle> {
        self.simulate(Operation::RequestVerification).await?;
        let mut state = self.lock();
        state.next_handle += 1;
        let id = format!("vh-{}", state.next_handle);
        state.handles.insert(id.clone(), phone.clone());
        Ok(VerificationHandle::new(id))
    }

    async fn verify_code(
        &self,
        handle: &VerificationHandle,
        code: &str,
    ) -> BackendResult<AuthSession> {
        self.simulate(Operation::VerifyCode).await?;
        let user = {
            let mut state = self.lock();
            let phone = state.handles.get(handle.as_str()).cloned().ok_or_else(|| {
                BackendError::Rejected("The verification ID used is invalid.".to_string())
            })?;
            if code != state.code {
                return Err(BackendError::Rejected(
                    "The SMS verification code used to create the phone auth credential is invalid."
                        .to_string(),
                ));
            }
            state.handles.remove(handle.as_str());
            let uid = state
                .accounts
                .entry(phone.clone())
                .or_insert_with(|| Self::uid_for(&phone))
                .clone();
            AuthUser { uid, phone }
        };
        self.current.send_replace(Some(user.clone()));
        Ok(AuthSession {
            credential: SessionCredential::new(format!("token-{}", user.uid)),
            user,
        })
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    fn auth_state_changes(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.simulate(Operation::SignOut).await?;
        self.current.send_replace(None);
        Ok(())
    }

    async fn delete_current_user(&self) -> BackendResult<()> {
        self.simulate(Operation::DeleteUser).await?;
        let user = self
            .current_user()
            .ok_or_else(|| BackendError::NotFound("No user is signed in.".to_string()))?;
        self.lock().accounts.remove(&user.phone);
        self.current.send_replace(None);
        Ok(())
    }

    async fn register_push_token(
        &self,
        token: &PushToken,
        environment: PushEnvironment,
    ) -> BackendResult<()> {
        self.simulate(Operation::RegisterPushToken).await?;
        self.lock().push_tokens.push((token.clone(), environment));
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryBackend {
    async fn get(&self, collection: &str, key: &str) -> BackendResult<Option<ProfileDocument>> {
        self.simulate(Operation::GetDocument).await?;
        Ok(self.document(collection, key))
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        profile: &ProfileDocument,
    ) -> BackendResult<()> {
        self.simulate(Operation::SetDocument).await?;
        self.seed_document(collection, key, profile.clone());
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        update: &ProfileUpdate,
    ) -> BackendResult<()> {
        self.simulate(Operation::UpdateDocument).await?;
        let mut state = self.lock();
        let doc = state
            .documents
            .get_mut(&(collection.to_string(), key.to_string()))
            .ok_or_else(|| BackendError::NotFound(format!("No document to update: {key}")))?;
        doc.apply(update);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> BackendResult<()> {
        self.simulate(Operation::DeleteDocument).await?;
        self.lock()
            .documents
            .remove(&(collection.to_string(), key.to_string()));
        Ok(())
    }

    async fn find_by_username(&self, collection: &str, username: &str) -> BackendResult<bool> {
        self.simulate(Operation::QueryUsername).await?;
        let state = self.lock();
        Ok(state
            .documents
            .iter()
            .any(|((c, _), doc)| c == collection && doc.username == username))
    }

    fn listen(
        &self,
        collection: &str,
        key: &str,
    ) -> BoxStream<'static, BackendResult<DocumentSnapshot>> {
        let mut state = self.lock();
        *state.calls.entry(Operation::Listen).or_insert(0) += 1;
        if state.failures.contains(&Operation::Listen) {
            return stream::iter(vec![Err(BackendError::Unavailable(
                "Simulated failure: Listen".to_string(),
            ))])
            .boxed();
        }
        let snapshots = state.listener_script.take().unwrap_or_else(|| {
            let profile = state
                .documents
                .get(&(collection.to_string(), key.to_string()))
                .cloned();
            vec![
                DocumentSnapshot {
                    profile: profile.clone(),
                    from_cache: true,
                },
                DocumentSnapshot {
                    profile,
                    from_cache: false,
                },
            ]
        });
        stream::iter(snapshots.into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryBackend {
    async fn put(&self, path: &str, bytes: &[u8]) -> BackendResult<()> {
        self.simulate(Operation::PutObject).await?;
        self.seed_object(path, bytes.to_vec());
        Ok(())
    }

    async fn download_url(&self, path: &str) -> BackendResult<String> {
        self.simulate(Operation::DownloadUrl).await?;
        if self.lock().objects.contains_key(path) {
            Ok(format!("{URL_SCHEME}{path}"))
        } else {
            Err(BackendError::NotFound(format!("Object does not exist: {path}")))
        }
    }

    async fn fetch(&self, url: &str, max_bytes: usize) -> BackendResult<Vec<u8>> {
        self.simulate(Operation::FetchObject).await?;
        let path = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| BackendError::Rejected(format!("Unsupported URL: {url}")))?;
        let bytes = self
            .object(path)
            .ok_or_else(|| BackendError::NotFound(format!("Object does not exist: {path}")))?;
        if bytes.len() > max_bytes {
            return Err(BackendError::Rejected(format!(
                "Object exceeds maximum size of {max_bytes} bytes"
            )));
        }
        Ok(bytes)
    }

    async fn delete(&self, path: &str) -> BackendResult<()> {
        self.simulate(Operation::DeleteObject).await?;
        self.lock()
            .objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("Object does not exist: {path}")))
    }
}
