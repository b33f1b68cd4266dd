//! Type-state IMAP client connection.
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after a successful AUTHENTICATE
//! - `Selected`: after a successful SELECT
//!
//! Each state only exposes the commands valid in it.

mod authenticated;
mod not_authenticated;
mod selected;

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

pub use self::authenticated::SelectOutcome;
pub use self::not_authenticated::AuthOutcome;
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::response::{Response, Untagged};
use crate::types::{Completion, MailboxStatus, Status};
use crate::{Error, Result};

/// Marker type for the not-authenticated state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a selected mailbox.
#[derive(Debug, Clone, Default)]
pub struct Selected {
    pub(crate) mailbox: String,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Returns the counts reported by SELECT.
    #[must_use]
    pub const fn status(&self) -> MailboxStatus {
        self.status
    }
}

/// IMAP client connection with type-state.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn into_state<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            state,
        }
    }

    /// Sends a command and collects responses up to its tagged completion.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<(Vec<Untagged>, Completion)> {
        let tag = self.tag_gen.next_tag();
        debug!(%tag, command = command_name(command), "sending IMAP command");
        self.stream.write_line(&command.serialize(&tag)).await?;
        self.read_until_tagged(&tag).await
    }

    pub(crate) async fn read_until_tagged(
        &mut self,
        tag: &str,
    ) -> Result<(Vec<Untagged>, Completion)> {
        let mut untagged = Vec::new();
        loop {
            let raw = self.stream.read_response().await?;
            match Response::parse(&raw)? {
                Response::Tagged {
                    tag: response_tag,
                    completion,
                } if response_tag == tag => {
                    debug!(%tag, status = %completion.status, "IMAP command completed");
                    if !completion.is_ok()
                        && let Some(text) = find_bye(&untagged)
                    {
                        return Err(Error::Bye(text.to_string()));
                    }
                    return Ok((untagged, completion));
                }
                Response::Tagged { tag: other, .. } => {
                    trace!(%other, "ignoring completion for another tag");
                }
                Response::Continuation(_) => {
                    return Err(Error::Protocol(
                        "unexpected continuation request".to_string(),
                    ));
                }
                Response::Untagged(data) => untagged.push(data),
            }
        }
    }

    /// Sends LOGOUT and consumes the client.
    ///
    /// The server's BYE is expected; a connection that drops before the
    /// tagged OK still counts as logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be written.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tag_gen.next_tag();
        self.stream
            .write_line(&Command::Logout.serialize(&tag))
            .await?;
        if let Err(e) = self.read_until_tagged(&tag).await {
            debug!(error = %e, "connection ended during LOGOUT");
        }
        Ok(())
    }
}

/// Returns the command keyword, for logs that must not carry arguments.
const fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Logout => "LOGOUT",
        Command::Authenticate { .. } => "AUTHENTICATE",
        Command::Select { .. } => "SELECT",
        Command::Search { .. } => "SEARCH",
        Command::Fetch { .. } => "FETCH",
        Command::Close => "CLOSE",
    }
}

/// Returns the text of the first untagged BYE, if any.
pub(crate) fn find_bye(untagged: &[Untagged]) -> Option<&str> {
    untagged.iter().find_map(|u| match u {
        Untagged::Status {
            status: Status::Bye,
            text,
        } => Some(text.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send<T: Send>() {}

    #[test]
    fn test_clients_are_send() {
        _assert_send::<Client<tokio::net::TcpStream, NotAuthenticated>>();
        _assert_send::<Client<tokio::net::TcpStream, Selected>>();
    }

    #[test]
    fn test_find_bye() {
        let untagged = vec![
            Untagged::Exists(3),
            Untagged::Status {
                status: Status::Bye,
                text: "shutting down".into(),
            },
        ];
        assert_eq!(find_bye(&untagged), Some("shutting down"));
        assert_eq!(find_bye(&[]), None);
    }
}
