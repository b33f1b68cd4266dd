//! Error types for token lifecycle operations.

use std::io;

/// Result type alias for token lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Token lifecycle error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required file or credential is absent.
    ///
    /// Always fatal; `hint` tells the user what to do about it.
    #[error("{what} not found. {hint}")]
    ConfigMissing {
        /// What is missing (usually a file path).
        what: String,
        /// Actionable next step for the user.
        hint: String,
    },

    /// The identity provider answered with an error payload.
    #[error("token exchange failed: {error} - {description}")]
    Exchange {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
        /// Raw response body as returned by the provider.
        payload: String,
    },

    /// The pasted redirect URL carries no `code=` parameter.
    #[error("no `code=` parameter found in the pasted URL")]
    CodeNotFound,

    /// The provider granted no refresh token.
    #[error("no refresh token in the token response (is `offline_access` among the scopes?)")]
    NoRefreshToken,

    /// Invalid token response.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TLS setup error for the redirect listener.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Creates a `ConfigMissing` error.
    #[must_use]
    pub fn config_missing(what: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ConfigMissing {
            what: what.into(),
            hint: hint.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_message_is_actionable() {
        let err = Error::config_missing(
            "Refresh token file imap_smtp_refresh_token",
            "Run `mailgrant authorize` first.",
        );
        assert_eq!(
            err.to_string(),
            "Refresh token file imap_smtp_refresh_token not found. Run `mailgrant authorize` first."
        );
    }
}
