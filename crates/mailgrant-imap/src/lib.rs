//! # mailgrant-imap
//!
//! A minimal async IMAP client for reading a mailbox with an `OAuth2`
//! access token.
//!
//! ## Features
//!
//! - **Type-state connection management**: `NotAuthenticated` →
//!   `Authenticated` → `Selected`, enforced at compile time
//! - **SASL AUTHENTICATE**: pluggable [`Authenticator`]s; [`XOAuth2`] ships
//!   with the crate
//! - **Soft failures**: AUTHENTICATE, SELECT, SEARCH, FETCH and CLOSE hand
//!   back the server's [`Completion`] instead of failing the session
//! - **TLS via rustls**
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgrant_imap::{AuthOutcome, Client, FetchItems, SelectOutcome, XOAuth2};
//!
//! #[tokio::main]
//! async fn main() -> mailgrant_imap::Result<()> {
//!     let stream = mailgrant_imap::connect_tls("outlook.office365.com", 993).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = match client
//!         .authenticate(XOAuth2::for_user("user@example.com", "access-token"))
//!         .await?
//!     {
//!         AuthOutcome::Authenticated(client) => client,
//!         AuthOutcome::Rejected { client, .. } => return client.logout().await,
//!     };
//!
//!     if let SelectOutcome::Selected(mut inbox) = client.select("INBOX").await? {
//!         let (ids, _) = inbox.search("ALL").await?;
//!         if let Some(&last) = ids.last() {
//!             let (messages, _) = inbox.fetch(last, FetchItems::summary_headers()).await?;
//!             println!("{}", messages[0].text());
//!         }
//!         let (client, _) = inbox.close().await?;
//!         client.logout().await?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod response;
pub mod types;

pub use auth::{Authenticator, XOAuth2};
pub use command::{Command, FetchItems};
pub use connection::{
    AuthOutcome, Authenticated, Client, ImapStream, NotAuthenticated, SelectOutcome, Selected,
    connect_tls,
};
pub use error::{Error, Result};
pub use types::{Completion, FetchedMessage, MailboxStatus, Status};
