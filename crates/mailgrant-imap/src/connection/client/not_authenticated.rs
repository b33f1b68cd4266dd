//! Implementation for the not-authenticated state.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::{Authenticated, Client, NotAuthenticated};
use crate::auth::Authenticator;
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::response::{Response, Untagged};
use crate::types::{Completion, Status};
use crate::{Error, Result};

/// Continuations answered before giving up on a misbehaving server.
const MAX_SASL_ROUNDS: usize = 4;

/// Result of AUTHENTICATE.
///
/// A rejected exchange hands the connection back so the caller can still
/// LOGOUT.
#[derive(Debug)]
pub enum AuthOutcome<S> {
    /// The server accepted the credentials.
    Authenticated(Client<S, Authenticated>),
    /// The server answered `NO` or `BAD`.
    Rejected {
        /// The still-unauthenticated client.
        client: Client<S, NotAuthenticated>,
        /// The server's completion.
        completion: Completion,
    },
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bye`] if the server refuses the connection.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        match Response::parse(&greeting)? {
            Response::Untagged(Untagged::Status {
                status: Status::Ok | Status::PreAuth,
                text,
            }) => debug!(%text, "IMAP greeting"),
            Response::Untagged(Untagged::Status {
                status: Status::Bye,
                text,
            }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            state: NotAuthenticated,
        })
    }

    /// Runs a SASL `AUTHENTICATE` exchange.
    ///
    /// Every continuation request is answered with the authenticator's
    /// response, base64-encoded on the wire.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport or protocol failures; a refusal
    /// is [`AuthOutcome::Rejected`].
    pub async fn authenticate<A: Authenticator>(
        mut self,
        mut authenticator: A,
    ) -> Result<AuthOutcome<S>> {
        let mechanism = authenticator.mechanism().to_string();
        let tag = self.tag_gen.next_tag();
        debug!(%tag, %mechanism, "sending AUTHENTICATE");
        self.stream
            .write_line(&Command::Authenticate { mechanism: mechanism.clone() }.serialize(&tag))
            .await?;

        let mut rounds = 0;
        loop {
            let raw = self.stream.read_response().await?;
            match Response::parse(&raw)? {
                Response::Continuation(challenge) => {
                    rounds += 1;
                    if rounds > MAX_SASL_ROUNDS {
                        return Err(Error::Protocol(format!(
                            "{mechanism} exchange did not complete after {MAX_SASL_ROUNDS} rounds"
                        )));
                    }
                    let decoded = STANDARD.decode(challenge.as_bytes()).unwrap_or_default();
                    let response = STANDARD.encode(authenticator.respond(&decoded));
                    self.stream.write_line(response.as_bytes()).await?;
                }
                Response::Tagged {
                    tag: response_tag,
                    completion,
                } if response_tag == tag => {
                    if completion.is_ok() {
                        info!(%mechanism, "IMAP authentication succeeded");
                        return Ok(AuthOutcome::Authenticated(self.into_state(Authenticated)));
                    }
                    warn!(%mechanism, %completion, "IMAP authentication rejected");
                    return Ok(AuthOutcome::Rejected {
                        client: self,
                        completion,
                    });
                }
                Response::Tagged { .. } | Response::Untagged(_) => {}
            }
        }
    }
}
