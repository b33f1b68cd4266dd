//! Static OAuth client settings.
//!
//! Every field has a default that works against Microsoft 365 with
//! Thunderbird's public client registration, which most tenants already
//! know. Values are usually read from the `[oauth]` table of the
//! application's TOML config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Thunderbird's public client id.
pub const DEFAULT_CLIENT_ID: &str = "9e5f94bc-e8a4-4e73-b8be-63364c29d753";

/// Redirect URI registered for the default client.
///
/// The provider compares it verbatim, including scheme and port.
pub const DEFAULT_REDIRECT_URI: &str = "https://localhost:7598/";

/// Scope granting IMAP access.
pub const SCOPE_IMAP: &str = "https://outlook.office.com/IMAP.AccessAsUser.All";
/// Scope granting SMTP submission.
pub const SCOPE_SMTP: &str = "https://outlook.office.com/SMTP.Send";
/// Scope granting a refresh token.
pub const SCOPE_OFFLINE: &str = "offline_access";

/// OAuth client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registered application (client) id.
    pub client_id: String,
    /// Client secret; empty for public clients.
    pub client_secret: String,
    /// Scopes requested on every grant.
    pub scopes: Vec<String>,
    /// Tenant-scoped authority, e.g. `https://login.microsoftonline.com/<tenant>/`.
    ///
    /// `None` uses the `common` endpoint.
    pub authority: Option<String>,
    /// Redirect URI the local listener answers on.
    pub redirect_uri: String,
    /// File holding the refresh token.
    pub refresh_token_file: PathBuf,
    /// File holding the most recent access token.
    pub access_token_file: PathBuf,
    /// PEM certificate for the redirect listener.
    pub tls_cert: PathBuf,
    /// PEM private key for the redirect listener.
    pub tls_key: PathBuf,
    /// How long the redirect listener waits; 0 waits forever.
    pub listener_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: String::new(),
            scopes: vec![
                SCOPE_IMAP.to_string(),
                SCOPE_SMTP.to_string(),
                SCOPE_OFFLINE.to_string(),
            ],
            authority: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            refresh_token_file: PathBuf::from("imap_smtp_refresh_token"),
            access_token_file: PathBuf::from("imap_smtp_access_token"),
            tls_cert: PathBuf::from("server.cert"),
            tls_key: PathBuf::from("server.key"),
            listener_timeout_secs: 300,
        }
    }
}

impl Settings {
    /// Returns the client secret, or `None` for a public client.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        Some(self.client_secret.as_str()).filter(|s| !s.is_empty())
    }

    /// Returns the redirect listener timeout, `None` meaning no limit.
    #[must_use]
    pub const fn listener_timeout(&self) -> Option<Duration> {
        match self.listener_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Resolves relative file paths against `base`.
    #[must_use]
    pub fn resolved_against(mut self, base: &Path) -> Self {
        for path in [
            &mut self.refresh_token_file,
            &mut self.access_token_file,
            &mut self.tls_cert,
            &mut self.tls_key,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}
