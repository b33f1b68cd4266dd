//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

use super::{Authenticated, Client, Selected};
use crate::Result;
use crate::command::Command;
use crate::response::Untagged;
use crate::types::{Completion, MailboxStatus};

/// Result of SELECT.
///
/// A refused SELECT leaves the session authenticated and usable.
#[derive(Debug)]
pub enum SelectOutcome<S> {
    /// The mailbox is selected.
    Selected(Client<S, Selected>),
    /// The server answered `NO` or `BAD`.
    Rejected {
        /// The still-authenticated client.
        client: Client<S, Authenticated>,
        /// The server's completion.
        completion: Completion,
    },
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport or protocol failures; a refusal
    /// is [`SelectOutcome::Rejected`].
    pub async fn select(mut self, mailbox: &str) -> Result<SelectOutcome<S>> {
        let (untagged, completion) = self
            .execute(&Command::Select {
                mailbox: mailbox.to_string(),
            })
            .await?;

        if !completion.is_ok() {
            warn!(mailbox, %completion, "SELECT refused");
            return Ok(SelectOutcome::Rejected {
                client: self,
                completion,
            });
        }

        let mut status = MailboxStatus::default();
        for data in untagged {
            match data {
                Untagged::Exists(n) => status.exists = n,
                Untagged::Recent(n) => status.recent = n,
                _ => {}
            }
        }

        Ok(SelectOutcome::Selected(self.into_state(Selected {
            mailbox: mailbox.to_string(),
            status,
        })))
    }
}
