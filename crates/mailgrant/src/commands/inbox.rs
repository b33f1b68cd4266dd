//! `mailgrant inbox`

use std::io::{self, Write};

use anyhow::Context;
use mailgrant_imap::{
    AuthOutcome, Client, FetchItems, NotAuthenticated, SelectOutcome, Selected, XOAuth2,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::AppConfig;

const RULE: &str = "------------------------------------------------------------";

/// Lists the newest `limit` messages of the inbox, newest first.
pub async fn run(config: &AppConfig, user: &str, limit: usize) -> anyhow::Result<()> {
    let access_token = super::lifecycle(&config.oauth)?.refresh().await?;

    tracing::info!(user, host = %config.mail.imap_host, "connecting to IMAP");
    let stream = mailgrant_imap::connect_tls(&config.mail.imap_host, config.mail.imap_port)
        .await
        .context("IMAP connection failed")?;
    let client = Client::from_stream(stream).await?;
    show_inbox(client, XOAuth2::for_user(user, &access_token), limit, &mut io::stdout()).await
}

/// Authenticates, lists the inbox and logs out on every path past the
/// greeting.
async fn show_inbox<S, W>(
    client: Client<S, NotAuthenticated>,
    credentials: XOAuth2,
    limit: usize,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: Write,
{
    let client = match client.authenticate(credentials).await? {
        AuthOutcome::Authenticated(client) => client,
        AuthOutcome::Rejected { client, completion } => {
            logout(client).await;
            anyhow::bail!("IMAP authentication failed: {completion}");
        }
    };

    let mut inbox = match client.select("INBOX").await? {
        SelectOutcome::Selected(inbox) => inbox,
        SelectOutcome::Rejected { client, completion } => {
            writeln!(out, "Failed to select INBOX: {completion}")?;
            logout(client).await;
            return Ok(());
        }
    };

    let listed = list_newest(&mut inbox, limit, out).await;

    match inbox.close().await {
        Ok((client, _)) => logout(client).await,
        Err(e) => tracing::debug!(error = %e, "CLOSE failed during teardown"),
    }
    listed
}

/// Prints the header blocks of the newest `limit` messages.
async fn list_newest<S, W>(
    inbox: &mut Client<S, Selected>,
    limit: usize,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: Write,
{
    let (ids, completion) = inbox.search("ALL").await?;
    if !completion.is_ok() || ids.is_empty() {
        writeln!(out, "No messages found.")?;
        return Ok(());
    }

    let newest = newest_first(&ids, limit);
    writeln!(out, "Showing up to last {} messages:\n", newest.len())?;

    for id in newest {
        let (messages, completion) = inbox.fetch(id, FetchItems::summary_headers()).await?;
        if !completion.is_ok() {
            tracing::debug!(id, %completion, "FETCH refused, skipping");
            continue;
        }
        let Some(message) = messages.first() else {
            continue;
        };
        writeln!(out, "{RULE}")?;
        writeln!(out, "{}", message.text().trim())?;
    }
    Ok(())
}

/// The last `limit` ids, newest first.
fn newest_first(ids: &[u32], limit: usize) -> Vec<u32> {
    ids.iter().rev().take(limit).copied().collect()
}

async fn logout<S, State>(client: Client<S, State>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = client.logout().await {
        tracing::debug!(error = %e, "LOGOUT failed during teardown");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailgrant_oauth::xoauth2::Payload;
    use tokio_test::io::{Builder, Mock};

    #[test]
    fn test_newest_first() {
        assert_eq!(newest_first(&[1, 2, 3, 4], 2), vec![4, 3]);
        assert_eq!(newest_first(&[1, 2], 15), vec![2, 1]);
        assert!(newest_first(&[1, 2], 0).is_empty());
    }

    /// Greeting, accepted AUTHENTICATE and the SELECT command line.
    fn selected_prefix() -> Builder {
        let auth = format!(
            "{}\r\n",
            Payload::new("me@example.com", "access").to_base64()
        );
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0000 AUTHENTICATE XOAUTH2\r\n")
            .read(b"+ \r\n")
            .write(auth.as_bytes())
            .read(b"A0000 OK done\r\n")
            .write(b"A0001 SELECT INBOX\r\n");
        builder
    }

    fn selected_session() -> Builder {
        let mut builder = selected_prefix();
        builder.read(b"* 3 EXISTS\r\nA0001 OK done\r\n");
        builder
    }

    async fn open_inbox(mock: Mock) -> Client<Mock, Selected> {
        let outcome = Client::from_stream(mock)
            .await
            .unwrap()
            .authenticate(XOAuth2::for_user("me@example.com", "access"))
            .await
            .unwrap();
        let AuthOutcome::Authenticated(client) = outcome else {
            panic!("AUTHENTICATE should succeed");
        };
        match client.select("INBOX").await.unwrap() {
            SelectOutcome::Selected(inbox) => inbox,
            SelectOutcome::Rejected { .. } => panic!("SELECT should succeed"),
        }
    }

    #[tokio::test]
    async fn test_lists_newest_and_skips_refused_fetch() {
        let mock = selected_session()
            .write(b"A0002 SEARCH ALL\r\n")
            .read(b"* SEARCH 1 2 3\r\nA0002 OK done\r\n")
            .write(b"A0003 FETCH 3 (BODY.PEEK[HEADER.FIELDS (FROM SUBJECT DATE)])\r\n")
            .read(b"* 3 FETCH (BODY[HEADER.FIELDS (FROM SUBJECT DATE)] {15}\r\nSubject: three\n)\r\n")
            .read(b"A0003 OK done\r\n")
            .write(b"A0004 FETCH 2 (BODY.PEEK[HEADER.FIELDS (FROM SUBJECT DATE)])\r\n")
            .read(b"A0004 NO message expunged\r\n")
            .build();

        let mut inbox = open_inbox(mock).await;
        let mut out = Vec::new();
        list_newest(&mut inbox, 2, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Showing up to last 2 messages:\n"));
        assert!(text.contains(&format!("{RULE}\nSubject: three\n")));
        assert_eq!(text.matches(RULE).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_search_prints_no_messages() {
        let mock = selected_session()
            .write(b"A0002 SEARCH ALL\r\n")
            .read(b"* SEARCH\r\nA0002 OK done\r\n")
            .build();

        let mut inbox = open_inbox(mock).await;
        let mut out = Vec::new();
        list_newest(&mut inbox, 15, &mut out).await.unwrap();
        assert_eq!(out, b"No messages found.\n");
    }

    #[tokio::test]
    async fn test_refused_search_prints_no_messages() {
        let mock = selected_session()
            .write(b"A0002 SEARCH ALL\r\n")
            .read(b"A0002 BAD command unknown\r\n")
            .build();

        let mut inbox = open_inbox(mock).await;
        let mut out = Vec::new();
        list_newest(&mut inbox, 15, &mut out).await.unwrap();
        assert_eq!(out, b"No messages found.\n");
    }

    #[tokio::test]
    async fn test_rejected_authentication_still_logs_out() {
        let auth = format!(
            "{}\r\n",
            Payload::new("me@example.com", "expired").to_base64()
        );
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 AUTHENTICATE XOAUTH2\r\n")
            .read(b"+ \r\n")
            .write(auth.as_bytes())
            .read(b"A0000 NO AUTHENTICATE failed.\r\n")
            .write(b"A0001 LOGOUT\r\n")
            .read(b"* BYE signing off\r\nA0001 OK LOGOUT completed.\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let mut out = Vec::new();
        let err = show_inbox(
            client,
            XOAuth2::for_user("me@example.com", "expired"),
            15,
            &mut out,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("AUTHENTICATE failed"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_refused_select_prints_and_logs_out() {
        let mock = selected_prefix()
            .read(b"A0001 NO mailbox unavailable\r\n")
            .write(b"A0002 LOGOUT\r\n")
            .read(b"* BYE signing off\r\nA0002 OK LOGOUT completed.\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let mut out = Vec::new();
        show_inbox(client, XOAuth2::for_user("me@example.com", "access"), 15, &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Failed to select INBOX: NO mailbox unavailable"));
    }
}
