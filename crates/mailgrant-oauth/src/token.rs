//! Token types returned by the token endpoint.

use std::fmt;

use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

/// Access/refresh token pair from a successful exchange.
///
/// The access token is short-lived and is treated as expired after every
/// run. The refresh token is optional: providers rotate it at their
/// discretion, and a missing one means the previous refresh token stays
/// authoritative.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Access token presented to IMAP/SMTP.
    pub access_token: String,
    /// Refresh token, if the provider issued (or rotated) one.
    pub refresh_token: Option<String>,
    /// Expiration time computed from `expires_in`.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    /// Creates a token pair without refresh token or expiry.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Returns the refresh token, treating an empty string as absent.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns the rotated refresh token, or `previous` when none was issued.
    #[must_use]
    pub fn refresh_token_or<'a>(&'a self, previous: &'a str) -> &'a str {
        self.refresh_token().unwrap_or(previous)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Raw token endpoint response body.
///
/// Success and error share one shape so that an `error` field wins
/// regardless of the HTTP status it came with.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    /// Interprets a token endpoint body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exchange`] when the body carries an `error` field,
    /// [`Error::Json`] when it is not JSON, and [`Error::InvalidResponse`]
    /// when the access token is missing.
    pub(crate) fn parse(body: &str) -> Result<TokenPair> {
        let response: Self = serde_json::from_str(body)?;

        if let Some(error) = response.error {
            return Err(Error::Exchange {
                error,
                description: response.error_description.unwrap_or_default(),
                payload: body.to_string(),
            });
        }

        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidResponse("missing access_token".into()))?;

        // Lifetimes chrono cannot represent leave the expiry unknown.
        let expires_at = response
            .expires_in
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Ok(TokenPair {
            access_token,
            refresh_token: response.refresh_token,
            expires_at,
        })
    }
}
