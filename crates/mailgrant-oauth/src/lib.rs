//! # mailgrant-oauth
//!
//! `OAuth2` token lifecycle for XOAUTH2 access to IMAP/SMTP mailboxes.
//!
//! ## Features
//!
//! - **Authorization Code Flow**: consent in a browser, captured by a local
//!   TLS redirect listener or pasted by hand on headless hosts
//! - **Refresh**: redeem the stored refresh token, honoring rotation
//! - **Token store**: two plain-text files, owner-only permissions
//! - **SASL**: XOAUTH2 payloads, raw for IMAP and base64 for SMTP
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgrant_oauth::{Settings, TokenExchanger, TokenLifecycle, TokenStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::default();
//!     let lifecycle = TokenLifecycle::new(
//!         TokenExchanger::from_settings(&settings)?,
//!         TokenStore::new(&settings.refresh_token_file, &settings.access_token_file),
//!     );
//!
//!     let access_token = lifecycle.refresh().await?;
//!     let payload = mailgrant_oauth::xoauth2::Payload::new("user@example.com", &access_token);
//!     // IMAP: AUTHENTICATE XOAUTH2 with payload.as_str()
//!     // SMTP: AUTH XOAUTH2 payload.to_base64()
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod authorize;
pub mod capture;
pub mod config;
mod error;
pub mod exchange;
pub mod lifecycle;
pub mod provider;
pub mod store;
pub mod token;
pub mod xoauth2;

pub use authorize::AuthorizationRequest;
pub use capture::{AuthorizationCodeCapture, CaptureSource, CapturedCode, TlsMaterial};
pub use config::Settings;
pub use error::{Error, Result};
pub use exchange::TokenExchanger;
pub use lifecycle::TokenLifecycle;
pub use provider::Provider;
pub use store::TokenStore;
pub use token::TokenPair;
