//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

use super::{Authenticated, Client, Selected};
use crate::Result;
use crate::command::{Command, FetchItems};
use crate::response::Untagged;
use crate::types::{Completion, FetchedMessage};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox state.
    #[must_use]
    pub const fn selected(&self) -> &Selected {
        &self.state
    }

    /// Searches the mailbox and returns matching sequence numbers.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport or protocol failures; check the
    /// completion for a refusal.
    pub async fn search(&mut self, criteria: &str) -> Result<(Vec<u32>, Completion)> {
        let (untagged, completion) = self
            .execute(&Command::Search {
                criteria: criteria.to_string(),
            })
            .await?;

        if !completion.is_ok() {
            warn!(%completion, "SEARCH refused");
        }

        let ids = untagged
            .into_iter()
            .filter_map(|data| match data {
                Untagged::Search(ids) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect();

        Ok((ids, completion))
    }

    /// Fetches data items for one message.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport or protocol failures; check the
    /// completion for a refusal.
    pub async fn fetch(
        &mut self,
        sequence: u32,
        items: FetchItems,
    ) -> Result<(Vec<FetchedMessage>, Completion)> {
        let (untagged, completion) = self.execute(&Command::Fetch { sequence, items }).await?;

        if !completion.is_ok() {
            warn!(sequence, %completion, "FETCH refused");
        }

        let messages = untagged
            .into_iter()
            .filter_map(|data| match data {
                Untagged::Fetch(message) => Some(message),
                _ => None,
            })
            .collect();

        Ok((messages, completion))
    }

    /// Closes the mailbox and returns to the authenticated state.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport or protocol failures.
    pub async fn close(mut self) -> Result<(Client<S, Authenticated>, Completion)> {
        let (_, completion) = self.execute(&Command::Close).await?;
        Ok((self.into_state(Authenticated), completion))
    }
}
