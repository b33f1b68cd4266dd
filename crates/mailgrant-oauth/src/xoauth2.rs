//! SASL XOAUTH2 payloads.
//!
//! The mechanism binds a user to a bearer token in a single client
//! response:
//!
//! ```text
//! user=<user>\x01auth=Bearer <token>\x01\x01
//! ```
//!
//! IMAP clients hand the raw payload to the `AUTHENTICATE` exchange, which
//! base64-encodes it on the wire. SMTP clients send `AUTH XOAUTH2 <base64>`
//! themselves, so they need the encoded form. Swapping the two makes the
//! server reject the credentials.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// A raw XOAUTH2 client response, valid for one authentication attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    /// Builds the payload for `username` and `access_token`.
    #[must_use]
    pub fn new(username: &str, access_token: &str) -> Self {
        Self(build_payload(username, access_token))
    }

    /// Returns the raw (unencoded) payload.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns the base64-encoded payload.
    #[must_use]
    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(<redacted>)")
    }
}

/// Builds the raw XOAUTH2 payload.
#[must_use]
pub fn build_payload(username: &str, access_token: &str) -> String {
    format!("user={username}\x01auth=Bearer {access_token}\x01\x01")
}

/// Standard base64 of the payload's UTF-8 bytes, without line wrapping.
#[must_use]
pub fn encode_base64(payload: &str) -> String {
    STANDARD.encode(payload.as_bytes())
}

/// Error status a server sends as an XOAUTH2 challenge on failure.
///
/// Encoded as base64 JSON: `{"status":"401","schemes":"bearer","scope":"..."}`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ErrorChallenge {
    /// HTTP-like status code.
    pub status: String,
    /// Authentication schemes supported.
    #[serde(default)]
    pub schemes: Option<String>,
    /// Scope required.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Decodes a base64 XOAUTH2 error challenge.
///
/// Returns `None` if the challenge is not base64 JSON of the expected shape.
#[must_use]
pub fn parse_error_challenge(challenge: &str) -> Option<ErrorChallenge> {
    let decoded = STANDARD.decode(challenge.trim()).ok()?;
    serde_json::from_slice(&decoded).ok()
}
