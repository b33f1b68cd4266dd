//! TCP connect and the STARTTLS handshake.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use crate::error::Result;

/// Connects to an SMTP submission port over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<TcpStream> {
    let stream = TcpStream::connect((hostname, port)).await?;
    tracing::debug!(hostname, port, "SMTP TCP connection established");
    Ok(stream)
}

/// Runs the TLS handshake over an already-connected TCP stream.
///
/// # Errors
///
/// Returns an error if `hostname` is not a valid DNS name or the handshake
/// fails.
pub async fn upgrade_to_tls(tcp: TcpStream, hostname: &str) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())?;
    let tls = create_tls_connector().connect(server_name, tcp).await?;
    tracing::debug!(hostname, "SMTP connection upgraded to TLS");
    Ok(tls)
}

/// Creates a TLS connector trusting the webpki root set.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
