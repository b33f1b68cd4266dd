//! Type-state SMTP client.

use std::future::Future;
use std::marker::PhantomData;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use super::{ServerInfo, upgrade_to_tls};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Reply, ReplyCode};

/// Longest reply line buffered before the server is treated as broken.
const MAX_REPLY_LINE: usize = 64 * 1024;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<S, State> {
    stream: BufReader<S>,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Result of `AUTH XOAUTH2`.
///
/// A rejected token is an expected outcome rather than an error: the
/// connection stays usable so the caller can still `QUIT`.
#[derive(Debug)]
pub enum AuthOutcome<S> {
    /// The server answered 235.
    Authenticated(Client<S, Authenticated>),
    /// Any other final reply.
    Failed {
        /// The connection, still open.
        client: Client<S, Connected>,
        /// Final reply code (e.g. 535).
        code: ReplyCode,
        /// Final reply text.
        message: String,
    },
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the greeting is not
    /// 2xx.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut stream = BufReader::new(stream);
        let greeting = read_reply(&mut stream).await?;
        if !greeting.is_success() {
            return Err(Error::smtp_error(
                greeting.code.as_u16(),
                greeting.message_text(),
            ));
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .expect_success(&Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        // First line is the server's greeting text.
        self.server_info.replace_extensions(reply.message.iter().skip(1));
        Ok(self)
    }

    /// Sends STARTTLS, hands the raw stream to `upgrade`, then repeats EHLO
    /// on the upgraded stream since capabilities may change after TLS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the last EHLO did not advertise
    /// STARTTLS, an SMTP error if the server refuses it, or whatever
    /// `upgrade` or the second EHLO fail with.
    pub async fn starttls_with<T, F, Fut>(
        mut self,
        client_hostname: &str,
        upgrade: F,
    ) -> Result<Client<T, Connected>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
        F: FnOnce(S) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(&Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        let upgraded = upgrade(self.stream.into_inner()).await?;
        let client = Client {
            stream: BufReader::new(upgraded),
            server_info: ServerInfo {
                hostname: self.server_info.hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        };
        client.ehlo(client_hostname).await
    }

    /// Authenticates with `AUTH XOAUTH2 <encoded>`.
    ///
    /// `encoded` must already be the base64 form of the XOAUTH2 payload.
    /// Only a 235 reply authenticates; anything else comes back as
    /// [`AuthOutcome::Failed`]. When the server answers with a 334 error
    /// challenge, its JSON status is logged and the empty response line is
    /// sent so the server can deliver its final reply.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O or malformed replies.
    pub async fn auth_xoauth2(mut self, encoded: &str) -> Result<AuthOutcome<S>> {
        if !self
            .server_info
            .auth_mechanisms()
            .contains(&AuthMechanism::XOAuth2)
        {
            tracing::debug!("server did not advertise XOAUTH2, trying anyway");
        }

        let mut reply = self
            .send_command(&Command::Auth {
                mechanism: AuthMechanism::XOAuth2,
                initial_response: Some(encoded.to_string()),
            })
            .await?;

        if reply.code == ReplyCode::AUTH_CONTINUE {
            match mailgrant_oauth::xoauth2::parse_error_challenge(&reply.message_text()) {
                Some(challenge) => tracing::warn!(
                    status = %challenge.status,
                    scope = challenge.scope.as_deref().unwrap_or("-"),
                    "SMTP server rejected the bearer token"
                ),
                None => tracing::warn!("SMTP server sent an unreadable XOAUTH2 challenge"),
            }
            reply = self.send_command(&Command::AuthCancel).await?;
        }

        if reply.code == ReplyCode::AUTH_SUCCESS {
            tracing::info!("SMTP XOAUTH2 authentication succeeded");
            return Ok(AuthOutcome::Authenticated(self.into_state()));
        }

        tracing::warn!(code = %reply.code, "SMTP XOAUTH2 authentication failed");
        let message = reply.message_text();
        Ok(AuthOutcome::Failed {
            client: self,
            code: reply.code,
            message,
        })
    }
}

impl Client<TcpStream, Connected> {
    /// Upgrades a plain TCP session with STARTTLS using the webpki roots.
    ///
    /// `server_host` is checked against the certificate; `client_hostname`
    /// is sent in the second EHLO.
    ///
    /// # Errors
    ///
    /// See [`Client::starttls_with`].
    pub async fn starttls(
        self,
        server_host: &str,
        client_hostname: &str,
    ) -> Result<Client<TlsStream<TcpStream>, Connected>> {
        let server_host = server_host.to_string();
        self.starttls_with(client_hostname, move |tcp| async move {
            upgrade_to_tls(tcp, &server_host).await
        })
        .await
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Runs a whole MAIL FROM / RCPT TO / DATA transaction.
    ///
    /// The client is borrowed, so the caller can still `QUIT` after a
    /// rejection. Line endings are normalized to CRLF, lines starting with
    /// `.` are dot-stuffed, and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for an empty recipient list, or the
    /// first reply the server rejects.
    pub async fn send_mail(
        &mut self,
        from: &Address,
        to: &[Address],
        message: &[u8],
    ) -> Result<()> {
        if to.is_empty() {
            return Err(Error::InvalidAddress("no recipients".into()));
        }

        self.expect_success(&Command::MailFrom { from: from.clone() })
            .await?;
        for recipient in to {
            self.expect_success(&Command::RcptTo {
                to: recipient.clone(),
            })
            .await?;
        }
        self.start_data().await?;
        self.write_data(message).await
    }
}

// Common implementation for all states
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server information from the last EHLO.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn expect_success(&mut self, cmd: &Command) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        reply_ok(&reply)?;
        Ok(reply)
    }

    async fn start_data(&mut self) -> Result<()> {
        let reply = self.send_command(&Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(())
    }

    async fn write_data(&mut self, message: &[u8]) -> Result<()> {
        let body = self.stream.get_mut();
        for line in message.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                body.write_all(b".").await?;
            }
            body.write_all(line).await?;
            body.write_all(b"\r\n").await?;
        }
        body.write_all(b".\r\n").await?;
        body.flush().await?;

        let reply = read_reply(&mut self.stream).await?;
        reply_ok(&reply)?;
        tracing::info!("message accepted for delivery");
        Ok(())
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::debug!(command = ?cmd, "SMTP send");
        let writer = self.stream.get_mut();
        writer.write_all(&cmd.serialize()).await?;
        writer.flush().await?;
        let reply = read_reply(&mut self.stream).await?;
        tracing::debug!(code = %reply.code, "SMTP reply");
        Ok(reply)
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(())
    }
}

fn reply_ok(reply: &Reply) -> Result<()> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()))
    }
}

async fn read_reply<R: AsyncRead + Unpin>(stream: &mut BufReader<R>) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        let n = (&mut *stream)
            .take(MAX_REPLY_LINE as u64)
            .read_line(&mut line)
            .await?;
        if !line.ends_with('\n') {
            if n >= MAX_REPLY_LINE {
                return Err(Error::Protocol("reply line too long".into()));
            }
            return Err(Error::Protocol("connection closed by server".into()));
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(line);
        lines.push(line.to_string());
        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::{Builder, Mock};

    const EHLO_REPLY: &[u8] =
        b"250-smtp.example.com Hello\r\n250-STARTTLS\r\n250 AUTH LOGIN XOAUTH2\r\n";

    async fn greeted(mock: Mock) -> Client<Mock, Connected> {
        Client::from_stream(mock)
            .await
            .unwrap()
            .ehlo("client.local")
            .await
            .unwrap()
    }

    fn session() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"220 smtp.example.com ESMTP ready\r\n")
            .write(b"EHLO client.local\r\n")
            .read(EHLO_REPLY);
        builder
    }

    #[tokio::test]
    async fn test_greeting_and_ehlo() {
        let client = greeted(session().build()).await;
        assert_eq!(client.server_info().hostname, "smtp.example.com");
        assert!(client.server_info().supports_starttls());
    }

    #[tokio::test]
    async fn test_rejected_greeting() {
        let mock = Builder::new().read(b"554 go away\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 554, .. }));
    }

    #[tokio::test]
    async fn test_auth_235_authenticates() {
        let mock = session()
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"235 2.7.0 Authentication successful\r\n")
            .build();
        let outcome = greeted(mock).await.auth_xoauth2("dG9rZW4=").await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));
    }

    #[tokio::test]
    async fn test_auth_535_fails_with_code_and_text() {
        let mock = session()
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"535 5.7.3 Authentication unsuccessful\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 2.0.0 Bye\r\n")
            .build();
        let outcome = greeted(mock).await.auth_xoauth2("dG9rZW4=").await.unwrap();

        let AuthOutcome::Failed {
            client,
            code,
            message,
        } = outcome
        else {
            panic!("535 must not authenticate");
        };
        assert_eq!(code, ReplyCode::AUTH_FAILED);
        assert_eq!(message, "5.7.3 Authentication unsuccessful");
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_error_challenge_gets_empty_line() {
        // {"status":"401","schemes":"bearer"}
        let mock = session()
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"334 eyJzdGF0dXMiOiI0MDEiLCJzY2hlbWVzIjoiYmVhcmVyIn0=\r\n")
            .write(b"\r\n")
            .read(b"535 5.7.3 Authentication unsuccessful\r\n")
            .build();
        let outcome = greeted(mock).await.auth_xoauth2("dG9rZW4=").await.unwrap();
        assert!(matches!(
            outcome,
            AuthOutcome::Failed { code, .. } if code.as_u16() == 535
        ));
    }

    #[tokio::test]
    async fn test_other_success_codes_are_not_235() {
        let mock = session()
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"250 OK\r\n")
            .build();
        let outcome = greeted(mock).await.auth_xoauth2("dG9rZW4=").await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_starttls_repeats_ehlo() {
        let mock = session()
            .write(b"STARTTLS\r\n")
            .read(b"220 2.0.0 SMTP server ready\r\n")
            .write(b"EHLO client.local\r\n")
            .read(b"250-smtp.example.com Hello\r\n250 AUTH XOAUTH2\r\n")
            .build();
        let client = greeted(mock)
            .await
            .starttls_with("client.local", |stream| async move { Ok(stream) })
            .await
            .unwrap();

        assert!(!client.server_info().supports_starttls());
        assert_eq!(
            client.server_info().auth_mechanisms(),
            vec![AuthMechanism::XOAuth2]
        );
    }

    #[tokio::test]
    async fn test_starttls_not_advertised() {
        let mock = Builder::new()
            .read(b"220 ready\r\n")
            .write(b"EHLO client.local\r\n")
            .read(b"250 smtp.example.com\r\n")
            .build();
        let err = greeted(mock)
            .await
            .starttls_with("client.local", |stream| async move { Ok(stream) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_send_mail_dot_stuffs() {
        let mock = session()
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<me@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<a@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<b@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"DATA\r\n")
            .read(b"354 go ahead\r\n")
            .write(b"Subject: hi\r\n")
            .write(b"\r\n")
            .write(b".")
            .write(b".hidden\r\n")
            .write(b".\r\n")
            .read(b"250 queued\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let AuthOutcome::Authenticated(mut client) =
            greeted(mock).await.auth_xoauth2("dG9rZW4=").await.unwrap()
        else {
            panic!("235 must authenticate");
        };
        client
            .send_mail(
                &Address::new("me@example.com").unwrap(),
                &[
                    Address::new("a@example.com").unwrap(),
                    Address::new("b@example.com").unwrap(),
                ],
                b"Subject: hi\n\n.hidden",
            )
            .await
            .unwrap();
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_mail_keeps_session_after_rejection() {
        let mock = session()
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"235 ok\r\n")
            .write(b"MAIL FROM:<me@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<nobody@example.com>\r\n")
            .read(b"550 5.1.10 Recipient not found\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let AuthOutcome::Authenticated(mut client) =
            greeted(mock).await.auth_xoauth2("dG9rZW4=").await.unwrap()
        else {
            panic!("235 must authenticate");
        };
        let err = client
            .send_mail(
                &Address::new("me@example.com").unwrap(),
                &[Address::new("nobody@example.com").unwrap()],
                b"body",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 550, .. }));
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_mail_without_recipients() {
        let mock = session()
            .write(b"AUTH XOAUTH2 dG9rZW4=\r\n")
            .read(b"235 ok\r\n")
            .build();
        let AuthOutcome::Authenticated(mut client) =
            greeted(mock).await.auth_xoauth2("dG9rZW4=").await.unwrap()
        else {
            panic!("235 must authenticate");
        };
        let err = client
            .send_mail(&Address::new("me@example.com").unwrap(), &[], b"body")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_overlong_reply_line_is_protocol_error() {
        let mut line = b"220 ".to_vec();
        line.resize(MAX_REPLY_LINE + 16, b'x');
        let mock = Builder::new().read(&line).build();

        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ref text) if text.contains("too long")));
    }

    #[tokio::test]
    async fn test_closed_connection_is_protocol_error() {
        let mock = Builder::new().build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
