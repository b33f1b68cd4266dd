//! Integration tests for the TLS redirect listener.
//!
//! Each test generates a throwaway self-signed certificate and drives the
//! listener with a real HTTPS client.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::time::Duration;

use mailgrant_oauth::TlsMaterial;
use mailgrant_oauth::capture::CallbackListener;
use mailgrant_oauth::capture::listener::SUCCESS_BODY;

fn self_signed(dir: &tempfile::TempDir) -> TlsMaterial {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert = dir.path().join("server.cert");
    let key = dir.path().join("server.key");
    fs::write(&cert, certified.cert.pem()).unwrap();
    fs::write(&key, certified.key_pair.serialize_pem()).unwrap();
    TlsMaterial::new(cert, key)
}

fn https_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}

async fn bound_listener(dir: &tempfile::TempDir) -> (CallbackListener, String) {
    let listener = CallbackListener::bind("127.0.0.1:0".parse().unwrap(), &self_signed(dir))
        .await
        .unwrap();
    let base = format!("https://127.0.0.1:{}", listener.local_addr().unwrap().port());
    (listener, base)
}

#[tokio::test]
async fn captures_code_from_redirect() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, base) = bound_listener(&dir).await;
    let waiting = tokio::spawn(listener.wait_for_code(Some(Duration::from_secs(10))));

    let response = https_client()
        .get(format!("{base}/?code=ABC123&state=xyz"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), SUCCESS_BODY);
    assert_eq!(waiting.await.unwrap().unwrap().as_deref(), Some("ABC123"));
}

#[tokio::test]
async fn captures_code_on_any_path() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, base) = bound_listener(&dir).await;
    let waiting = tokio::spawn(listener.wait_for_code(Some(Duration::from_secs(10))));

    https_client()
        .get(format!("{base}/auth/callback?state=xyz&code=M.C5%2B_x"))
        .send()
        .await
        .unwrap();

    assert_eq!(waiting.await.unwrap().unwrap().as_deref(), Some("M.C5+_x"));
}

#[tokio::test]
async fn redirect_without_code_yields_empty_code() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, base) = bound_listener(&dir).await;
    let waiting = tokio::spawn(listener.wait_for_code(Some(Duration::from_secs(10))));

    https_client()
        .get(format!("{base}/?error=access_denied"))
        .send()
        .await
        .unwrap();

    assert_eq!(waiting.await.unwrap().unwrap().as_deref(), Some(""));
}

#[tokio::test]
async fn non_get_requests_are_rejected_and_listening_continues() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, base) = bound_listener(&dir).await;
    let waiting = tokio::spawn(listener.wait_for_code(Some(Duration::from_secs(10))));
    let client = https_client();

    let rejected = client.post(format!("{base}/?code=nope")).send().await.unwrap();
    assert_eq!(rejected.status(), 405);

    client
        .get(format!("{base}/?code=second"))
        .send()
        .await
        .unwrap();
    assert_eq!(waiting.await.unwrap().unwrap().as_deref(), Some("second"));
}

#[tokio::test]
async fn listener_stops_after_first_capture() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, base) = bound_listener(&dir).await;

    let waiting = tokio::spawn(listener.wait_for_code(Some(Duration::from_secs(10))));
    https_client()
        .get(format!("{base}/?code=once"))
        .send()
        .await
        .unwrap();
    waiting.await.unwrap().unwrap();

    let again = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
        .get(format!("{base}/?code=twice"))
        .send()
        .await;
    assert!(again.is_err());
}

#[tokio::test]
async fn times_out_without_redirect() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, _) = bound_listener(&dir).await;

    let outcome = listener
        .wait_for_code(Some(Duration::from_millis(50)))
        .await
        .unwrap();

    assert!(outcome.is_none());
}
