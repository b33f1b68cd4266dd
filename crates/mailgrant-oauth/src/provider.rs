//! Identity provider endpoints.

use crate::error::{Error, Result};
use url::Url;

/// Authority used when no tenant is configured.
pub const COMMON_AUTHORITY: &str = "https://login.microsoftonline.com/common/";

/// Identity provider endpoint configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Microsoft").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Extra query parameters the provider expects on the authorization URL.
    pub auth_params: Vec<(String, String)>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            auth_params: Vec::new(),
        })
    }

    /// Adds a provider-specific authorization URL parameter.
    #[must_use]
    pub fn with_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth_params.push((key.into(), value.into()));
        self
    }

    /// Microsoft identity platform (v2.0 endpoints).
    ///
    /// `authority` selects the tenant, e.g.
    /// `https://login.microsoftonline.com/<tenant-id>/`; `None` uses
    /// [`COMMON_AUTHORITY`].
    ///
    /// # Errors
    ///
    /// Returns an error if the authority is not a valid base URL.
    pub fn microsoft(authority: Option<&str>) -> Result<Self> {
        let authority = authority.unwrap_or(COMMON_AUTHORITY);
        let mut base = Url::parse(authority)?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "authority is not a base URL: {authority}"
            )));
        }
        // A missing trailing slash would make `join` replace the tenant segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            name: "Microsoft".to_string(),
            auth_url: base.join("oauth2/v2.0/authorize")?,
            token_url: base.join("oauth2/v2.0/token")?,
            auth_params: Vec::new(),
        }
        .with_auth_param("response_mode", "query")
        .with_auth_param("prompt", "select_account"))
    }

    /// Validates that required URLs are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        for (label, url) in [("auth_url", &self.auth_url), ("token_url", &self.token_url)] {
            if !matches!(url.scheme(), "https" | "http") {
                return Err(Error::InvalidConfig(format!(
                    "{label} must be an http(s) URL: {url}"
                )));
            }
        }
        Ok(())
    }
}
