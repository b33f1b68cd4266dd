//! TLS transport for IMAP sessions.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::Result;

/// The transport [`connect_tls`] produces.
pub type ImapStream = TlsStream<TcpStream>;

/// Connects with implicit TLS (port 993), verifying the server against the
/// webpki roots.
///
/// # Errors
///
/// Returns an error if `host` is not a valid DNS name, or if the TCP
/// connection or the TLS handshake fails.
pub async fn connect_tls(host: &str, port: u16) -> Result<ImapStream> {
    let server_name = ServerName::try_from(host.to_string())?;
    let tcp = TcpStream::connect((host, port)).await?;
    let tls = tls_connector().connect(server_name, tcp).await?;
    debug!(host, port, "IMAP TLS session established");
    Ok(tls)
}

fn tls_connector() -> TlsConnector {
    let roots = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
