//! Integration tests for the authorize and refresh flows.
//!
//! A mock token endpoint stands in for the identity provider, and the token
//! files live in a temporary directory.

#![allow(clippy::unwrap_used)]

use std::fs;

use mailgrant_oauth::{
    AuthorizationCodeCapture, AuthorizationRequest, Error, Provider, TlsMaterial,
    TokenExchanger, TokenLifecycle, TokenStore,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    server: MockServer,
    dir: tempfile::TempDir,
    lifecycle: TokenLifecycle,
}

impl Fixture {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let exchanger = TokenExchanger::new(
            "client-1",
            vec!["offline_access".to_string()],
            provider(&server),
        );
        let store = TokenStore::new(dir.path().join("refresh"), dir.path().join("access"))
            .with_authorize_hint("Run `mailgrant authorize` first.");
        Self {
            server,
            dir,
            lifecycle: TokenLifecycle::new(exchanger, store),
        }
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).unwrap()
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.dir.path().join(name), contents).unwrap();
    }

    fn headless_capture(&self) -> AuthorizationCodeCapture {
        let request = AuthorizationRequest::new(
            "client-1",
            vec!["offline_access".to_string()],
            "https://localhost:7598/",
            provider(&self.server),
        );
        AuthorizationCodeCapture::new(
            request,
            TlsMaterial::new(self.dir.path().join("cert"), self.dir.path().join("key")),
        )
        .listen(false)
        .open_browser(false)
    }
}

fn provider(server: &MockServer) -> Provider {
    Provider::new(
        "Mock",
        format!("{}/authorize", server.uri()),
        format!("{}/token", server.uri()),
    )
    .unwrap()
}

async fn mount_token_response(server: &MockServer, grant: &str, body: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(grant))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn authorize_stores_both_tokens() {
    let fx = Fixture::new().await;
    mount_token_response(
        &fx.server,
        "code=ABC123",
        r#"{"access_token":"at-1","refresh_token":"rt-1","expires_in":3600}"#,
    )
    .await;

    let pasted = b"https://localhost:7598/?code=ABC123&state=xyz\n";
    fx.lifecycle
        .authorize(&fx.headless_capture(), &pasted[..], std::io::sink())
        .await
        .unwrap();

    assert_eq!(fx.read("refresh"), "rt-1");
    assert_eq!(fx.read("access"), "at-1");
}

#[tokio::test]
async fn authorize_without_refresh_token_writes_nothing() {
    let fx = Fixture::new().await;
    mount_token_response(&fx.server, "grant_type=authorization_code", r#"{"access_token":"at"}"#)
        .await;

    let err = fx
        .lifecycle
        .authorize(&fx.headless_capture(), &b"?code=c\n"[..], std::io::sink())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoRefreshToken));
    assert!(!fx.dir.path().join("refresh").exists());
    assert!(!fx.dir.path().join("access").exists());
}

#[tokio::test]
async fn refresh_without_rotation_keeps_stored_token() {
    let fx = Fixture::new().await;
    fx.write("refresh", "rt-old\n");
    mount_token_response(
        &fx.server,
        "refresh_token=rt-old",
        r#"{"access_token":"at-2","expires_in":3600}"#,
    )
    .await;

    let access = fx.lifecycle.refresh().await.unwrap();

    assert_eq!(access, "at-2");
    assert_eq!(fx.read("refresh"), "rt-old");
    assert_eq!(fx.read("access"), "at-2");
}

#[tokio::test]
async fn refresh_with_rotation_replaces_stored_token() {
    let fx = Fixture::new().await;
    fx.write("refresh", "rt-old");
    mount_token_response(
        &fx.server,
        "grant_type=refresh_token",
        r#"{"access_token":"at-3","refresh_token":"rt-new"}"#,
    )
    .await;

    fx.lifecycle.refresh().await.unwrap();

    assert_eq!(fx.read("refresh"), "rt-new");
    assert_eq!(fx.read("access"), "at-3");
}

#[tokio::test]
async fn refresh_error_leaves_files_untouched() {
    let fx = Fixture::new().await;
    fx.write("refresh", "rt-old");
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
        )
        .mount(&fx.server)
        .await;

    let err = fx.lifecycle.refresh().await.unwrap_err();

    assert!(matches!(err, Error::Exchange { .. }));
    assert_eq!(fx.read("refresh"), "rt-old");
    assert!(!fx.dir.path().join("access").exists());
}

#[tokio::test]
async fn refresh_before_authorize_is_config_missing() {
    let fx = Fixture::new().await;

    let err = fx.lifecycle.refresh().await.unwrap_err();

    assert!(matches!(err, Error::ConfigMissing { .. }));
    assert!(err.to_string().contains("mailgrant authorize"));
    assert!(fx.server.received_requests().await.unwrap().is_empty());
}
