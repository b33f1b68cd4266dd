//! Connection management: streams, framing and the type-state client.

pub mod client;
pub mod framed;
pub mod stream;

pub use client::{AuthOutcome, Authenticated, Client, NotAuthenticated, SelectOutcome, Selected};
pub use framed::FramedStream;
pub use stream::{ImapStream, connect_tls};
