//! SASL authenticators for `AUTHENTICATE`.
//!
//! The client owns the wire encoding: it base64-decodes each server
//! challenge before handing it over and base64-encodes whatever the
//! authenticator returns. Authenticators therefore deal in raw bytes.

use mailgrant_oauth::xoauth2::Payload;

/// Produces client responses for a SASL exchange.
pub trait Authenticator {
    /// SASL mechanism name, e.g. `XOAUTH2`.
    fn mechanism(&self) -> &str;

    /// Returns the raw response to a decoded server challenge.
    fn respond(&mut self, challenge: &[u8]) -> Vec<u8>;
}

/// XOAUTH2: one fixed response, whatever the server sends.
///
/// The mechanism completes in a single round trip; the server accepts or
/// rejects the first response.
#[derive(Debug, Clone)]
pub struct XOAuth2 {
    payload: Payload,
}

impl XOAuth2 {
    /// Wraps a raw (not base64-encoded) payload.
    #[must_use]
    pub const fn new(payload: Payload) -> Self {
        Self { payload }
    }

    /// Builds the payload for `username` and `access_token`.
    #[must_use]
    pub fn for_user(username: &str, access_token: &str) -> Self {
        Self::new(Payload::new(username, access_token))
    }
}

impl Authenticator for XOAuth2 {
    fn mechanism(&self) -> &str {
        "XOAUTH2"
    }

    fn respond(&mut self, _challenge: &[u8]) -> Vec<u8> {
        self.payload.as_bytes().to_vec()
    }
}
