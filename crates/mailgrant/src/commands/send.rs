//! `mailgrant send`

use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};
use mailgrant_oauth::xoauth2::Payload;
use mailgrant_smtp::{Address, AuthOutcome, Client, Connected};
use tokio::io::{AsyncRead, AsyncWrite};

use super::prompt;
use crate::config::AppConfig;
use crate::message::OutgoingMessage;

/// Message fields given on the command line; missing ones are prompted for.
#[derive(Debug, Default)]
pub struct Draft {
    pub user: Option<String>,
    pub to: Vec<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

/// A message ready for submission.
#[derive(Debug)]
struct Envelope {
    from: Address,
    to: Vec<Address>,
    message: OutgoingMessage,
}

impl Draft {
    /// Fills in missing fields interactively.
    ///
    /// Returns `None` when no recipients were given.
    fn complete(
        self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> anyhow::Result<Option<Envelope>> {
        let user = super::require_user(self.user, input, output)?;

        let mut to = split_recipients(&self.to);
        if to.is_empty() {
            let line = prompt(input, output, "To (comma-separated): ")?;
            to = split_recipients(&[line]);
        }
        if to.is_empty() {
            writeln!(output, "No recipients given.")?;
            return Ok(None);
        }

        let subject = match self.subject {
            Some(subject) => subject,
            None => prompt(input, output, "Subject: ")?,
        };
        let body = match self.body {
            Some(body) => body,
            None => {
                writeln!(output, "Message body (single line):")?;
                prompt(input, output, "")?
            }
        };

        let from = Address::new(&user)?;
        let recipients = to
            .iter()
            .map(Address::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Envelope {
            from,
            to: recipients,
            message: OutgoingMessage::new(user, to, subject, body),
        }))
    }
}

fn split_recipients(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sends one plain-text message as `user`.
pub async fn run(config: &AppConfig, draft: Draft) -> anyhow::Result<()> {
    let envelope = {
        let stdin = io::stdin();
        draft.complete(&mut stdin.lock(), &mut io::stdout())?
    };
    let Some(envelope) = envelope else {
        return Ok(());
    };

    let access_token = super::lifecycle(&config.oauth)?.refresh().await?;
    let encoded = Payload::new(envelope.from.as_str(), &access_token).to_base64();

    let mail = &config.mail;
    tracing::info!(user = %envelope.from, host = %mail.smtp_host, "connecting to SMTP");
    let tcp = mailgrant_smtp::connect(&mail.smtp_host, mail.smtp_port)
        .await
        .context("SMTP connection failed")?;
    let client = Client::from_stream(tcp)
        .await?
        .ehlo(&mail.ehlo_name)
        .await?
        .starttls(&mail.smtp_host, &mail.ehlo_name)
        .await
        .context("STARTTLS failed")?;

    submit(client, &encoded, &envelope).await?;
    println!("Message sent.");
    Ok(())
}

/// Authenticates and submits, sending QUIT whatever happens after EHLO.
async fn submit<S>(
    client: Client<S, Connected>,
    encoded: &str,
    envelope: &Envelope,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match client.auth_xoauth2(encoded).await? {
        AuthOutcome::Authenticated(mut client) => {
            let sent = client
                .send_mail(
                    &envelope.from,
                    &envelope.to,
                    envelope.message.to_rfc5322().as_bytes(),
                )
                .await;
            quit(client).await;
            sent.map_err(|e| {
                let hint = if e.is_permanent() {
                    "message was rejected"
                } else {
                    "message was not accepted, try again later"
                };
                anyhow::Error::new(e).context(hint)
            })
        }
        AuthOutcome::Failed {
            client,
            code,
            message,
        } => {
            quit(client).await;
            bail!("SMTP AUTH failed: {code} {message}")
        }
    }
}

async fn quit<S, State>(client: Client<S, State>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = client.quit().await {
        tracing::warn!(error = %e, "QUIT failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::{Builder, Mock};

    fn complete(draft: Draft, input: &str) -> (Option<Envelope>, String) {
        let mut output = Vec::new();
        let envelope = draft.complete(&mut input.as_bytes(), &mut output).unwrap();
        (envelope, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_split_recipients() {
        let values = vec![" a@example.com , ,b@example.com".to_string(), String::new()];
        assert_eq!(
            split_recipients(&values),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_complete_prompts_for_missing_fields() {
        let draft = Draft {
            user: Some("me@example.com".into()),
            ..Draft::default()
        };
        let (envelope, output) = complete(draft, "a@example.com, b@example.com\nHi\nHello there\n");

        let envelope = envelope.unwrap();
        assert_eq!(envelope.from.as_str(), "me@example.com");
        assert_eq!(envelope.to.len(), 2);
        assert_eq!(envelope.message.subject, "Hi");
        assert_eq!(envelope.message.body, "Hello there");
        assert!(output.contains("To (comma-separated): "));
        assert!(output.contains("Message body (single line):"));
    }

    #[test]
    fn test_no_recipients_aborts() {
        let draft = Draft {
            user: Some("me@example.com".into()),
            ..Draft::default()
        };
        let (envelope, output) = complete(draft, "\n");
        assert!(envelope.is_none());
        assert!(output.ends_with("No recipients given.\n"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let draft = Draft {
            user: Some("me@example.com".into()),
            to: vec!["not-an-address".into()],
            subject: Some("s".into()),
            body: Some("b".into()),
        };
        assert!(draft.complete(&mut &b""[..], &mut Vec::new()).is_err());
    }

    fn envelope() -> Envelope {
        complete(
            Draft {
                user: Some("me@example.com".into()),
                to: vec!["you@example.com".into()],
                subject: Some("Hi".into()),
                body: Some("Hello".into()),
            },
            "",
        )
        .0
        .unwrap()
    }

    async fn connected(builder: &mut Builder) -> Client<Mock, Connected> {
        let mock = builder.build();
        Client::from_stream(mock).await.unwrap()
    }

    #[tokio::test]
    async fn test_failed_auth_still_quits() {
        let mut builder = Builder::new();
        builder
            .read(b"220 ready\r\n")
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"535 5.7.3 Authentication unsuccessful\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n");

        let client = connected(&mut builder).await;
        let err = submit(client, "dG9rZW4=", &envelope()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "SMTP AUTH failed: 535 5.7.3 Authentication unsuccessful"
        );
    }

    #[tokio::test]
    async fn test_rejected_recipient_still_quits() {
        let mut builder = Builder::new();
        builder
            .read(b"220 ready\r\n")
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<me@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<you@example.com>\r\n")
            .read(b"550 5.1.10 RESOLVER.ADR.RecipientNotFound\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n");

        let client = connected(&mut builder).await;
        let err = submit(client, "dG9rZW4=", &envelope()).await.unwrap_err();
        let text = format!("{err:#}");
        assert!(text.starts_with("message was rejected"));
        assert!(text.contains("550"));
    }

    #[tokio::test]
    async fn test_temporary_failure_suggests_retry() {
        let mut builder = Builder::new();
        builder
            .read(b"220 ready\r\n")
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<me@example.com>\r\n")
            .read(b"451 4.3.0 Mail server temporarily rejected message\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n");

        let client = connected(&mut builder).await;
        let err = submit(client, "dG9rZW4=", &envelope()).await.unwrap_err();
        assert!(format!("{err:#}").starts_with("message was not accepted, try again later"));
    }
}
