//! Authorization request construction.

use crate::config::Settings;
use crate::error::Result;
use crate::provider::Provider;
use url::Url;

/// Parameters of one authorization-code flow.
///
/// Built once per flow and never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Client ID from the provider.
    pub client_id: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Redirect URI; must match the registration verbatim.
    pub redirect_uri: String,
    /// Provider endpoints (tenant authority already applied).
    pub provider: Provider,
}

impl AuthorizationRequest {
    /// Creates a new authorization request.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        scopes: Vec<String>,
        redirect_uri: impl Into<String>,
        provider: Provider,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            scopes,
            redirect_uri: redirect_uri.into(),
            provider,
        }
    }

    /// Creates the request described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authority is not a valid URL.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            &settings.client_id,
            settings.scopes.clone(),
            &settings.redirect_uri,
            Provider::microsoft(settings.authority.as_deref())?,
        ))
    }

    /// Builds the URL the user opens to grant consent.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider configuration is invalid.
    pub fn authorization_url(&self) -> Result<Url> {
        self.provider.validate()?;
        let mut url = self.provider.auth_url.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.redirect_uri);

            if !self.scopes.is_empty() {
                pairs.append_pair("scope", &self.scopes.join(" "));
            }

            for (key, value) in &self.provider.auth_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Parses the redirect URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not a valid URL.
    pub fn redirect_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.redirect_uri)?)
    }
}
