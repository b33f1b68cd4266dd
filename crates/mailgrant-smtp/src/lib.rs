//! # mailgrant-smtp
//!
//! A minimal async SMTP submission client that authenticates with an
//! `OAuth2` access token.
//!
//! ## Features
//!
//! - **Type-state client**: `Connected` → `Authenticated`, with the whole
//!   MAIL FROM / RCPT TO / DATA transaction behind one borrowing call
//! - **STARTTLS** with a second EHLO after the upgrade
//! - **`AUTH XOAUTH2`** issued directly with a pre-encoded payload; only a
//!   235 reply authenticates
//! - **TLS via rustls**
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgrant_smtp::{Address, AuthOutcome, Client};
//!
//! #[tokio::main]
//! async fn main() -> mailgrant_smtp::Result<()> {
//!     let tcp = mailgrant_smtp::connect("smtp.office365.com", 587).await?;
//!     let client = Client::from_stream(tcp).await?.ehlo("localhost").await?;
//!     let client = client.starttls("smtp.office365.com", "localhost").await?;
//!
//!     match client.auth_xoauth2(&encoded_payload).await? {
//!         AuthOutcome::Authenticated(mut client) => {
//!             let sent = client
//!                 .send_mail(
//!                     &Address::new("me@example.com")?,
//!                     &[Address::new("you@example.com")?],
//!                     b"Subject: hi\r\n\r\nHello",
//!                 )
//!                 .await;
//!             client.quit().await?;
//!             sent?;
//!         }
//!         AuthOutcome::Failed { client, code, message } => {
//!             eprintln!("{code} {message}");
//!             client.quit().await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::Command;
pub use connection::{
    AuthOutcome, Authenticated, Client, Connected, ServerInfo, connect, upgrade_to_tls,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
