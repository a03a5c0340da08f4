//! Backend abstraction traits.
//!
//! The managed backend (phone auth, document database, object storage) is
//! provided by the platform layer through these traits. Implementations wrap
//! the vendor SDK; the core never talks to the network directly.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync` so handles can be shared across
//! controllers and background tasks as `Arc<dyn Trait>`.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::watch;

use super::error::BackendResult;
use super::types::{
    AuthSession, AuthUser, DocumentSnapshot, PhoneNumber, PushEnvironment, PushToken,
    VerificationHandle,
};
use crate::profile::{ProfileDocument, ProfileUpdate};

/// Phone-number authentication.
///
/// # Example
///
/// ```ignore
/// use phoneid_core::backend::{AuthBackend, PhoneNumber};
///
/// let handle = auth.request_verification(&PhoneNumber::new("+15551234567")).await?;
/// let session = auth.verify_code(&handle, "123456").await?;
/// println!("signed in as {}", session.user.uid);
/// ```
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Asks the backend to send a one-time code to `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the number.
    async fn request_verification(&self, phone: &PhoneNumber)
        -> BackendResult<VerificationHandle>;

    /// Exchanges a verification handle and code for a session.
    ///
    /// # Errors
    ///
    /// Returns an error for a wrong code or an expired handle.
    async fn verify_code(&self, handle: &VerificationHandle, code: &str)
        -> BackendResult<AuthSession>;

    /// Returns the user of the cached credential, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Subscribes to credential changes (sign-in, sign-out, restore, revoke).
    fn auth_state_changes(&self) -> watch::Receiver<Option<AuthUser>>;

    /// Signs out, keeping the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential could not be cleared.
    async fn sign_out(&self) -> BackendResult<()>;

    /// Deletes the signed-in account and its credential.
    ///
    /// # Errors
    ///
    /// Returns an error if no user is signed in or the backend refuses.
    async fn delete_current_user(&self) -> BackendResult<()>;

    /// Forwards a device push token to the auth backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the token.
    async fn register_push_token(
        &self,
        token: &PushToken,
        environment: PushEnvironment,
    ) -> BackendResult<()>;
}

/// Document database holding one profile document per user.
///
/// `key` is the document id inside the configured users collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a profile document.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails. A missing document is `Ok(None)`.
    async fn get(&self, collection: &str, key: &str) -> BackendResult<Option<ProfileDocument>>;

    /// Creates or replaces a profile document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn set(&self, collection: &str, key: &str, profile: &ProfileDocument)
        -> BackendResult<()>;

    /// Updates the editable fields of an existing document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not exist or the write fails.
    async fn update(&self, collection: &str, key: &str, update: &ProfileUpdate)
        -> BackendResult<()>;

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn delete(&self, collection: &str, key: &str) -> BackendResult<()>;

    /// Returns whether any document has `username == username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn find_by_username(&self, collection: &str, username: &str) -> BackendResult<bool>;

    /// Subscribes to a single document.
    ///
    /// The stream typically yields a cached snapshot first and a
    /// server-confirmed one afterwards, then one per remote change.
    fn listen(
        &self,
        collection: &str,
        key: &str,
    ) -> BoxStream<'static, BackendResult<DocumentSnapshot>>;
}

/// Binary object storage for profile photos.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads `bytes` to `path`, overwriting any existing object.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    async fn put(&self, path: &str, bytes: &[u8]) -> BackendResult<()>;

    /// Returns a download URL for the object at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist.
    async fn download_url(&self, path: &str) -> BackendResult<String>;

    /// Downloads the object behind a download URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is missing or larger than `max_bytes`.
    async fn fetch(&self, url: &str, max_bytes: usize) -> BackendResult<Vec<u8>>;

    /// Deletes the object at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or the delete fails.
    async fn delete(&self, path: &str) -> BackendResult<()>;
}
