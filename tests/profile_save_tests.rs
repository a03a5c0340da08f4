//! Integration tests for profile creation and editing.
//!
//! These tests verify:
//! - the photo is uploaded before any document write
//! - an upload failure never writes or updates the document
//! - edits update only the editable fields and refresh the session
//! - the edit screen receives cached and remote photos
//! - leaving sign-up while a save runs never orphans a profile

mod helpers;

use std::time::Duration;

use helpers::{filled_form, phone, photo_path, sample_profile, uid, TestApp};
use phoneid_core::backend::memory::Operation;
use phoneid_core::profile::{PhotoSource, ProfileEvent, ProfileForm};
use phoneid_core::session::{Screen, SessionState};
use phoneid_core::CoreError;

#[tokio::test]
async fn create_profile_completes_sign_up() {
    let app = TestApp::new();
    app.sign_in().await;

    let document = app.core.save_profile(&filled_form()).await.unwrap();

    assert_eq!(document.username, "ada1815");
    assert_eq!(document.uid, uid().to_string());
    assert_eq!(document.profile_url, format!("memory://{}", photo_path()));
    assert_eq!(app.backend.document("users", uid().as_str()), Some(document));
    assert_eq!(app.session().state().screen(), Screen::Dashboard);
}

#[tokio::test]
async fn upload_failure_never_writes_document() {
    let app = TestApp::new();
    app.sign_in().await;
    app.backend.fail(Operation::PutObject);

    let err = app.core.save_profile(&filled_form()).await.unwrap_err();

    assert!(matches!(err, CoreError::Backend(_)));
    assert_eq!(app.backend.calls(Operation::DownloadUrl), 0);
    assert_eq!(app.backend.calls(Operation::SetDocument), 0);
    assert_eq!(app.backend.calls(Operation::UpdateDocument), 0);
    assert!(app.backend.document("users", uid().as_str()).is_none());
    assert_eq!(app.session().state().screen(), Screen::CreateProfile);
}

#[tokio::test]
async fn upload_failure_during_edit_leaves_document_untouched() {
    let app = TestApp::new();
    app.seed_profile();
    app.sign_in().await;
    app.backend.fail(Operation::PutObject);

    let mut form = app.core.edit_form().unwrap();
    form.set_first_name("Augusta");
    form.set_photo(vec![1, 2, 3]);
    assert!(app.core.save_profile(&form).await.is_err());

    assert_eq!(app.backend.calls(Operation::UpdateDocument), 0);
    assert_eq!(
        app.backend.document("users", uid().as_str()),
        Some(sample_profile())
    );
}

#[tokio::test]
async fn save_without_photo_is_rejected_locally() {
    let app = TestApp::new();
    app.sign_in().await;
    let mut form = ProfileForm::create();
    form.set_first_name("Ada");
    form.set_last_name("Lovelace");
    form.set_username("ada1815");

    assert_eq!(
        app.core.save_profile(&form).await.unwrap_err(),
        CoreError::MissingPhoto
    );
    assert_eq!(app.backend.calls(Operation::PutObject), 0);
}

#[tokio::test]
async fn edit_updates_fields_and_refreshes_session() {
    let app = TestApp::new();
    app.seed_profile();
    app.sign_in().await;

    let mut form = app.core.edit_form().unwrap();
    assert_eq!(form.username(), "ada1815");
    form.set_first_name("Augusta");
    form.set_username("Augusta1815");
    form.set_photo(vec![9, 9]);
    let document = app.core.save_profile(&form).await.unwrap();

    assert_eq!(app.backend.calls(Operation::UpdateDocument), 1);
    assert_eq!(app.backend.calls(Operation::SetDocument), 0);
    assert_eq!(document.first_name, "Augusta");
    assert_eq!(document.username, "augusta1815");
    assert_eq!(document.phone, sample_profile().phone);
    assert_eq!(app.backend.object(&photo_path()), Some(vec![9, 9]));

    let SessionState::AuthenticatedWithProfile { profile, .. } = app.session().state() else {
        panic!("expected AuthenticatedWithProfile");
    };
    assert_eq!(profile, document);
}

#[tokio::test]
async fn saved_photo_is_cached() {
    let app = TestApp::new();
    app.sign_in().await;
    app.core.save_profile(&filled_form()).await.unwrap();

    assert_eq!(
        app.core.cache().load(&uid()).unwrap(),
        Some(vec![0xFF, 0xD8, 0xFF, 0xE0])
    );
}

#[tokio::test]
async fn edit_screen_gets_cached_then_remote_photo() {
    let app = TestApp::new();
    app.sign_in().await;
    app.core.save_profile(&filled_form()).await.unwrap();
    // Stored object changed since it was cached.
    app.backend.seed_object(&photo_path(), vec![7, 7, 7]);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _sub = app
        .core
        .listen_profile(move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();

    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        events.push(event);
    }

    assert!(matches!(
        events.first(),
        Some(ProfileEvent::Loaded {
            provisional: true,
            ..
        })
    ));
    assert!(events.contains(&ProfileEvent::Photo {
        jpeg: vec![0xFF, 0xD8, 0xFF, 0xE0],
        source: PhotoSource::Cache,
    }));
    assert_eq!(
        events.last(),
        Some(&ProfileEvent::Photo {
            jpeg: vec![7, 7, 7],
            source: PhotoSource::Remote,
        })
    );
    assert_eq!(app.core.cache().load(&uid()).unwrap(), Some(vec![7, 7, 7]));
}

#[tokio::test]
async fn listen_profile_requires_sign_in() {
    let app = TestApp::new();
    assert!(app.core.listen_profile(|_| {}).is_err());
}

// ============================================================================
// Leaving sign-up during a save
// ============================================================================

#[tokio::test(start_paused = true)]
async fn backgrounding_during_save_lets_it_complete() {
    let app = TestApp::new();
    app.sign_in().await;
    app.backend
        .set_latency(Operation::PutObject, Duration::from_millis(200));

    let form = filled_form();
    let (saved, backgrounded) = tokio::join!(app.core.save_profile(&form), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        app.core.app_backgrounded().await
    });

    assert_eq!(backgrounded, Ok(false));
    assert!(saved.is_ok());
    assert_eq!(app.session().state().screen(), Screen::Dashboard);
    assert!(app.backend.has_account(&phone()));
    assert!(app.backend.document("users", uid().as_str()).is_some());
}

#[tokio::test(start_paused = true)]
async fn backgrounding_during_failed_save_deletes_account() {
    let app = TestApp::new();
    app.sign_in().await;
    app.backend
        .set_latency(Operation::PutObject, Duration::from_millis(200));
    app.backend.fail(Operation::SetDocument);

    let form = filled_form();
    let (saved, backgrounded) = tokio::join!(app.core.save_profile(&form), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        app.core.app_backgrounded().await
    });

    assert_eq!(backgrounded, Ok(false));
    assert!(saved.is_err());
    assert_eq!(app.session().state(), SessionState::Unauthenticated);
    assert!(!app.backend.has_account(&phone()));
    assert!(app.backend.document("users", uid().as_str()).is_none());
}

#[tokio::test(start_paused = true)]
async fn sign_out_during_save_removes_created_profile() {
    let app = TestApp::new();
    app.sign_in().await;
    app.backend
        .set_latency(Operation::PutObject, Duration::from_millis(200));

    let form = filled_form();
    let (saved, signed_out) = tokio::join!(app.core.save_profile(&form), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        app.core.sign_out().await
    });

    assert!(signed_out.is_ok());
    assert!(matches!(saved, Err(CoreError::InvalidTransition { .. })));
    assert!(app.backend.document("users", uid().as_str()).is_none());
    assert!(app.backend.object(&photo_path()).is_none());
}
