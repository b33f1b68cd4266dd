//! Token endpoint grants.

use crate::config::Settings;
use crate::error::Result;
use crate::provider::Provider;
use crate::token::{TokenPair, TokenResponse};
use reqwest::Client;
use tracing::{debug, info};

/// Client for the provider's token endpoint.
///
/// Both grants request the same fixed scope set. A client secret is sent
/// only for confidential clients.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    /// Client ID from the provider.
    pub client_id: String,
    /// Client secret (`None` for public clients).
    pub client_secret: Option<String>,
    /// Scopes requested on every grant.
    pub scopes: Vec<String>,
    /// Provider endpoints.
    pub provider: Provider,
    http_client: Client,
}

impl TokenExchanger {
    /// Creates a new exchanger for a public client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, scopes: Vec<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            scopes,
            provider,
            http_client: Client::new(),
        }
    }

    /// Creates an exchanger from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authority is invalid.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider = Provider::microsoft(settings.authority.as_deref())?;
        let mut exchanger = Self::new(&settings.client_id, settings.scopes.clone(), provider);
        if let Some(secret) = settings.client_secret() {
            exchanger = exchanger.with_client_secret(secret);
        }
        Ok(exchanger)
    }

    /// Sets the client secret (confidential client).
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Exchanges an authorization code for a token pair.
    ///
    /// Codes are single-use: call this exactly once per captured code and
    /// do not retry on failure.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Exchange`] with the provider's payload if the
    /// response carries an error field.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenPair> {
        debug!(token_url = %self.provider.token_url, "exchanging authorization code");
        let pair = self
            .request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;
        info!(expires_at = ?pair.expires_at, "authorization code exchanged");
        Ok(pair)
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// The returned pair's refresh token may be absent; callers keep using
    /// the one they passed in that case.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Exchange`] with the provider's payload if the
    /// response carries an error field.
    pub async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenPair> {
        debug!(token_url = %self.provider.token_url, "redeeming refresh token");
        let pair = self
            .request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        info!(
            expires_at = ?pair.expires_at,
            rotated = pair.refresh_token().is_some(),
            "access token refreshed"
        );
        Ok(pair)
    }

    async fn request(&self, grant: &[(&str, &str)]) -> Result<TokenPair> {
        let scope = self.scopes.join(" ");
        let mut params: Vec<(&str, &str)> = Vec::with_capacity(grant.len() + 3);
        params.push(("client_id", self.client_id.as_str()));
        params.extend_from_slice(grant);
        params.push(("scope", scope.as_str()));

        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "token endpoint answered");

        TokenResponse::parse(&body)
    }
}
