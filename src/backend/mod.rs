//! Managed-backend abstraction.
//!
//! Phone authentication, the profile document database and photo storage
//! are provided by a third-party platform. The core only sees them through
//! the traits in this module, injected as [`Backend`] handles, so every
//! controller can be exercised against [`memory::InMemoryBackend`].
//!
//! # Architecture
//!
//! ```text
//! Platform SDK wrapper (Swift / Kotlin / Dart)
//!     ├── impl AuthBackend
//!     ├── impl DocumentStore
//!     └── impl ObjectStorage
//!             │
//!             ▼
//!         Backend (Arc handles) ──► controllers
//! ```

mod error;
mod traits;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::sync::Arc;

pub use error::{BackendError, BackendResult};
pub use traits::{AuthBackend, DocumentStore, ObjectStorage};
pub use types::{
    AuthSession, AuthUser, DocumentSnapshot, PhoneNumber, PushEnvironment, PushToken,
    SessionCredential, UserId, VerificationHandle,
};

/// Injected backend handles shared by all controllers.
#[derive(Clone)]
pub struct Backend {
    /// Phone authentication.
    pub auth: Arc<dyn AuthBackend>,
    /// Profile documents.
    pub documents: Arc<dyn DocumentStore>,
    /// Profile photos.
    pub objects: Arc<dyn ObjectStorage>,
}

impl Backend {
    /// Bundles separate handles.
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            auth,
            documents,
            objects,
        }
    }

    /// Uses one object implementing all three traits for every handle.
    #[must_use]
    pub fn from_shared<T>(backend: Arc<T>) -> Self
    where
        T: AuthBackend + DocumentStore + ObjectStorage + 'static,
    {
        Self {
            auth: backend.clone(),
            documents: backend.clone(),
            objects: backend,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
