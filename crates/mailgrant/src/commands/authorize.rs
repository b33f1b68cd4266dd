//! `mailgrant authorize`

use std::io;

use anyhow::Context;
use mailgrant_oauth::{AuthorizationCodeCapture, AuthorizationRequest, TlsMaterial};

use crate::config::AppConfig;

/// Runs the consent flow and stores both tokens.
pub async fn run(config: &AppConfig, listen: bool) -> anyhow::Result<()> {
    let settings = &config.oauth;
    let request = AuthorizationRequest::from_settings(settings)?;
    let capture = AuthorizationCodeCapture::new(
        request,
        TlsMaterial::new(&settings.tls_cert, &settings.tls_key),
    )
    .listen(listen)
    .with_timeout(settings.listener_timeout());

    if !listen {
        tracing::info!("redirect listener disabled, the redirected URL will be pasted");
    }

    let lifecycle = super::lifecycle(settings)?;
    let stdin = io::stdin();
    lifecycle
        .authorize(&capture, stdin.lock(), io::stdout())
        .await
        .context("authorization failed")?;

    println!(
        "Refresh token saved to {}",
        lifecycle.store().refresh_path().display()
    );
    println!(
        "Access token saved to {}",
        lifecycle.store().access_path().display()
    );
    Ok(())
}
