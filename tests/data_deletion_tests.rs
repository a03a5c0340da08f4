//! Integration tests for the data deletion flow.
//!
//! These tests verify:
//! - the four steps run in order and report progress
//! - a failed photo deletion does not stop the flow
//! - a failed document or account deletion aborts it
//! - a phone-number profile key is used by save, lookup and deletion alike

mod helpers;

use std::sync::{Arc, Mutex};

use helpers::{filled_form, phone, photo_path, sample_profile, uid, TestApp};
use phoneid_core::backend::memory::Operation;
use phoneid_core::backend::AuthBackend;
use phoneid_core::deletion::DeletionStep;
use phoneid_core::session::{Screen, SessionState};
use phoneid_core::{CoreConfig, CoreError, ProfileKey};

async fn signed_up_app() -> TestApp {
    let app = TestApp::new();
    app.sign_in().await;
    app.core.save_profile(&filled_form()).await.unwrap();
    app
}

#[tokio::test]
async fn deletes_everything_in_order() {
    let app = signed_up_app().await;
    let steps = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&steps);
    let _sub = app.core.deletion().subscribe(move |step| {
        sink.lock().unwrap().push(*step);
    });

    let report = app.core.delete_account_data().await.unwrap();

    assert!(report.photo_deleted);
    assert!(report.cache_cleared);
    assert_eq!(
        *steps.lock().unwrap(),
        vec![
            DeletionStep::DeletingProfile,
            DeletionStep::DeletingPhoto,
            DeletionStep::ClearingCache,
            DeletionStep::DeletingAccount,
        ]
    );
    assert!(app.backend.document("users", uid().as_str()).is_none());
    assert!(app.backend.object(&photo_path()).is_none());
    assert_eq!(app.core.cache().load(&uid()).unwrap(), None);
    assert!(!app.backend.has_account(&phone()));
    assert_eq!(app.session().state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn photo_deletion_failure_still_completes() {
    let app = signed_up_app().await;
    app.backend.fail(Operation::DeleteObject);

    let report = app.core.delete_account_data().await.unwrap();

    assert!(!report.photo_deleted);
    assert!(app.backend.document("users", uid().as_str()).is_none());
    assert_eq!(app.core.cache().load(&uid()).unwrap(), None);
    assert!(app.backend.current_user().is_none());
    assert_eq!(app.session().state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn missing_photo_object_still_completes() {
    let app = TestApp::new();
    app.backend
        .seed_document("users", uid().as_str(), sample_profile());
    app.sign_in().await;

    let report = app.core.delete_account_data().await.unwrap();

    assert!(!report.photo_deleted);
    assert!(!report.cache_cleared);
    assert!(!app.backend.has_account(&phone()));
}

#[tokio::test]
async fn document_deletion_failure_aborts() {
    let app = signed_up_app().await;
    app.backend.fail(Operation::DeleteDocument);

    let err = app.core.delete_account_data().await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::DeletionFailed {
            step: "user profile",
            ..
        }
    ));
    assert!(err.user_message().starts_with("Failed to delete user profile: "));
    assert_eq!(app.backend.calls(Operation::DeleteObject), 0);
    assert_eq!(app.backend.calls(Operation::DeleteUser), 0);
    assert!(app.backend.object(&photo_path()).is_some());
    assert_eq!(app.session().state().screen(), Screen::Dashboard);
}

#[tokio::test]
async fn account_deletion_failure_keeps_earlier_steps() {
    let app = signed_up_app().await;
    app.backend.fail(Operation::DeleteUser);

    let err = app.core.delete_account_data().await.unwrap_err();

    assert!(err
        .user_message()
        .starts_with("Failed to delete authentication account: "));
    assert!(app.backend.document("users", uid().as_str()).is_none());
    assert!(app.backend.object(&photo_path()).is_none());
    assert!(app.backend.has_account(&phone()));
    assert_eq!(app.session().state().screen(), Screen::Dashboard);
}

#[tokio::test]
async fn requires_signed_in_user() {
    let app = TestApp::new();

    let err = app.core.delete_account_data().await.unwrap_err();

    assert_eq!(err, CoreError::NotAuthenticated);
    assert_eq!(err.user_message(), "No authenticated user found.");
    assert_eq!(app.backend.calls(Operation::DeleteDocument), 0);
}

#[tokio::test]
async fn phone_number_key_is_used_throughout() {
    let config = CoreConfig {
        profile_key: ProfileKey::PhoneNumber,
        ..CoreConfig::default()
    };
    let app = TestApp::with_config(config.clone());
    app.sign_in().await;
    app.core.save_profile(&filled_form()).await.unwrap();

    let key = phone().to_string();
    let path = format!("profiles/{key}.jpg");
    assert!(app.backend.document("users", &key).is_some());
    assert!(app.backend.object(&path).is_some());
    assert!(app.backend.document("users", uid().as_str()).is_none());

    let relaunched = TestApp::with_parts(Arc::clone(&app.backend), config);
    let state = relaunched.session().bootstrap().await.unwrap();
    assert_eq!(state.screen(), Screen::Dashboard);

    let report = app.core.delete_account_data().await.unwrap();
    assert!(report.photo_deleted);
    assert!(app.backend.document("users", &key).is_none());
    assert!(app.backend.object(&path).is_none());
}
