//! Shared fixtures for integration tests.
//!
//! Every test gets its own [`InMemoryBackend`] and a unique cache
//! directory, removed again when the [`TestApp`] is dropped.

#![allow(dead_code)]

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use phoneid_core::backend::memory::{InMemoryBackend, DEFAULT_TEST_CODE};
use phoneid_core::backend::{Backend, PhoneNumber, UserId};
use phoneid_core::profile::{ProfileDocument, ProfileForm};
use phoneid_core::session::{SessionController, SessionState};
use phoneid_core::{CoreConfig, PhoneIdCore};

/// National number typed on the login screen.
pub const PHONE_INPUT: &str = "5551234567";

/// Atomic counter for unique test directory names.
static HELPER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Creates a unique temporary directory path for test isolation.
pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let id = HELPER_COUNTER.fetch_add(1, Ordering::SeqCst);
    env::temp_dir().join(format!(
        "phoneid_test_{}_{}_{}",
        prefix,
        std::process::id(),
        id
    ))
}

/// The number [`PHONE_INPUT`] formats to.
pub fn phone() -> PhoneNumber {
    PhoneNumber::new("+15551234567")
}

/// User id the in-memory backend assigns to [`phone`].
pub fn uid() -> UserId {
    InMemoryBackend::uid_for(&phone())
}

/// Storage path of the test user's photo.
pub fn photo_path() -> String {
    format!("profiles/{}.jpg", uid())
}

/// A complete profile document for the test user.
pub fn sample_profile() -> ProfileDocument {
    ProfileDocument {
        uid: uid().to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        username: "ada1815".to_string(),
        phone: phone().to_string(),
        profile_url: format!("memory://{}", photo_path()),
    }
}

/// A create form ready to save.
pub fn filled_form() -> ProfileForm {
    let mut form = ProfileForm::create();
    form.set_first_name("Ada");
    form.set_last_name("Lovelace");
    form.set_username("Ada1815");
    form.set_photo(vec![0xFF, 0xD8, 0xFF, 0xE0]);
    form
}

/// One app instance on top of a shared in-memory backend.
pub struct TestApp {
    pub core: PhoneIdCore,
    pub backend: Arc<InMemoryBackend>,
    pub cache_dir: PathBuf,
}

impl TestApp {
    /// Fresh backend, default configuration.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::new()))
    }

    /// New app instance (a relaunch) on an existing backend.
    pub fn with_backend(backend: Arc<InMemoryBackend>) -> Self {
        Self::with_parts(backend, CoreConfig::default())
    }

    /// Fresh backend, custom configuration.
    pub fn with_config(config: CoreConfig) -> Self {
        Self::with_parts(Arc::new(InMemoryBackend::new()), config)
    }

    pub fn with_parts(backend: Arc<InMemoryBackend>, config: CoreConfig) -> Self {
        let cache_dir = unique_temp_dir("app");
        let core = PhoneIdCore::new(config, Backend::from_shared(backend.clone()), &cache_dir)
            .expect("config is valid");
        Self {
            core,
            backend,
            cache_dir,
        }
    }

    pub fn session(&self) -> &SessionController {
        self.core.session()
    }

    /// Seeds the test user's profile document and photo.
    pub fn seed_profile(&self) {
        self.backend
            .seed_document("users", uid().as_str(), sample_profile());
        self.backend.seed_object(&photo_path(), vec![0xFF, 0xD8]);
    }

    /// Requests a code and enters the accepted one.
    pub async fn sign_in(&self) -> SessionState {
        self.session()
            .submit_phone_number(PHONE_INPUT)
            .await
            .expect("code request succeeds");
        self.session()
            .submit_code(DEFAULT_TEST_CODE)
            .await
            .expect("code is accepted")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.cache_dir);
    }
}

/// Polls until `predicate` holds for the session state, failing after 2s.
pub async fn wait_for_state(
    session: &SessionController,
    predicate: impl Fn(&SessionState) -> bool,
) -> SessionState {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let state = session.state();
            if predicate(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("state reached in time")
}
