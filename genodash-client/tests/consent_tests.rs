//! Consent gate behavior against a scripted backend

mod helpers;

use genodash_client::ApiClient;
use genodash_common::Error;
use helpers::{patient_session, spawn, test_config, MockBackend};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn ensure_consent_signs_once_and_caches() {
    let mock = MockBackend::new();
    let base_url = spawn(mock.clone()).await;
    let client = ApiClient::new(&test_config(&base_url), patient_session()).unwrap();

    let first = client.consent.ensure_consent().await.unwrap();
    let second = client.consent.ensure_consent().await.unwrap();

    assert_eq!(first, "c-1");
    assert_eq!(second, "c-1");
    // Idempotence: the second call never reached the network
    assert_eq!(mock.sign_calls.load(Ordering::SeqCst), 1);
    assert!(client.consent.is_signed());
}

#[tokio::test]
async fn concurrent_callers_share_one_sign_request() {
    let mock = MockBackend::new();
    let base_url = spawn(mock.clone()).await;
    let client = Arc::new(ApiClient::new(&test_config(&base_url), patient_session()).unwrap());

    let a = {
        let client = client.clone();
        tokio::spawn(async move { client.consent.ensure_consent().await })
    };
    let b = {
        let client = client.clone();
        tokio::spawn(async move { client.consent.ensure_consent().await })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(a, "c-1");
    assert_eq!(b, "c-1");
    assert_eq!(
        mock.sign_calls.load(Ordering::SeqCst),
        1,
        "concurrent callers must share one in-flight sign request"
    );
}

#[tokio::test]
async fn already_signed_conflict_refetches_existing_record() {
    let mock = MockBackend::new();
    *mock.sign_response.lock().unwrap() = Some((
        409,
        json!({ "message": "You have already signed a consent form" }),
    ));
    mock.consents.lock().unwrap().push(json!({
        "consentId": "c-existing",
        "userId": "u-1",
        "signed": true,
    }));
    let base_url = spawn(mock.clone()).await;
    let client = ApiClient::new(&test_config(&base_url), patient_session()).unwrap();

    let id = client.consent.ensure_consent().await.unwrap();
    assert_eq!(id, "c-existing");

    // Conflict resolved once; the cache now short-circuits
    let again = client.consent.ensure_consent().await.unwrap();
    assert_eq!(again, "c-existing");
    assert_eq!(mock.sign_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthenticated_sign_is_fatal() {
    let mock = MockBackend::new();
    *mock.sign_response.lock().unwrap() =
        Some((401, json!({ "message": "Please log in to sign consent" })));
    let base_url = spawn(mock.clone()).await;
    let client = ApiClient::new(&test_config(&base_url), patient_session()).unwrap();

    let err = client.consent.ensure_consent().await.unwrap_err();
    assert!(matches!(err, Error::Auth { status: 401, .. }));
    assert!(!client.consent.is_signed());
}

#[tokio::test]
async fn forbidden_sign_is_fatal() {
    let mock = MockBackend::new();
    *mock.sign_response.lock().unwrap() = Some((
        403,
        json!({ "message": "You do not have permission to sign consent" }),
    ));
    let base_url = spawn(mock.clone()).await;
    let client = ApiClient::new(&test_config(&base_url), patient_session()).unwrap();

    let err = client.consent.ensure_consent().await.unwrap_err();
    assert!(matches!(err, Error::Auth { status: 403, .. }));
}

#[tokio::test]
async fn server_error_preserves_backend_message() {
    let mock = MockBackend::new();
    *mock.sign_response.lock().unwrap() =
        Some((500, json!({ "message": "consent database unavailable" })));
    let base_url = spawn(mock.clone()).await;
    let client = ApiClient::new(&test_config(&base_url), patient_session()).unwrap();

    match client.consent.ensure_consent().await.unwrap_err() {
        Error::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "consent database unavailable");
        }
        other => panic!("expected Server error, got {other:?}"),
    }
    // One-shot: no automatic retry happened
    assert_eq!(mock.sign_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_session_fails_before_any_request() {
    let mock = MockBackend::new();
    let base_url = spawn(mock.clone()).await;
    let session = Arc::new(genodash_client::session::SessionStore::in_memory());
    let client = ApiClient::new(&test_config(&base_url), session).unwrap();

    let err = client.consent.ensure_consent().await.unwrap_err();
    assert!(matches!(err, Error::Auth { status: 401, .. }));
    assert_eq!(mock.sign_calls.load(Ordering::SeqCst), 0);
}
