//! Initial authorization and refresh, tied to the token store.

use std::io::{BufRead, Write};

use tracing::info;

use crate::capture::AuthorizationCodeCapture;
use crate::error::{Error, Result};
use crate::exchange::TokenExchanger;
use crate::store::TokenStore;
use crate::token::TokenPair;

/// Runs the two token flows against one store.
#[derive(Debug, Clone)]
pub struct TokenLifecycle {
    exchanger: TokenExchanger,
    store: TokenStore,
}

impl TokenLifecycle {
    /// Creates a lifecycle.
    #[must_use]
    pub const fn new(exchanger: TokenExchanger, store: TokenStore) -> Self {
        Self { exchanger, store }
    }

    /// Returns the token store.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Captures a code, exchanges it, and persists both tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRefreshToken`] if the provider granted no refresh
    /// token, in which case nothing is written. Exchange errors carry the
    /// provider's payload and are never retried, since codes are single-use.
    pub async fn authorize<R: BufRead, W: Write>(
        &self,
        capture: &AuthorizationCodeCapture,
        input: R,
        output: W,
    ) -> Result<TokenPair> {
        let captured = capture.capture(input, output).await?;
        info!(source = ?captured.source, "authorization code captured");

        let pair = self
            .exchanger
            .exchange_code(&captured.code, &capture.request().redirect_uri)
            .await?;

        let refresh_token = pair.refresh_token().ok_or(Error::NoRefreshToken)?;
        self.store.write_refresh_token(refresh_token)?;
        self.store.write_access_token(&pair.access_token)?;

        info!(
            refresh = %self.store.refresh_path().display(),
            access = %self.store.access_path().display(),
            "tokens stored"
        );
        Ok(pair)
    }

    /// Redeems the stored refresh token for a fresh access token.
    ///
    /// A rotated refresh token replaces the stored one; otherwise the old
    /// value is rewritten unchanged. The access token is returned for
    /// immediate use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if no refresh token is stored.
    pub async fn refresh(&self) -> Result<String> {
        let previous = self.store.read_refresh_token()?;
        let pair = self.exchanger.exchange_refresh_token(&previous).await?;

        self.store
            .write_refresh_token(pair.refresh_token_or(&previous))?;
        self.store.write_access_token(&pair.access_token)?;

        Ok(pair.access_token)
    }
}
