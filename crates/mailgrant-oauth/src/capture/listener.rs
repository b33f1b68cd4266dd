//! TLS-terminated loopback listener for the authorization redirect.
//!
//! An axum router answers `GET` on any path and hands the first `code`
//! parameter to [`CallbackListener::wait_for_code`] over a oneshot channel.
//! The waiting side, not the handler, shuts the server down through its
//! [`Handle`].

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::routing::get;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};

/// Body returned to the browser once a request has been captured.
pub const SUCCESS_BODY: &str = "Success. You can return to the terminal.\r\n";

/// How long open browser connections get to finish once a code is in.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type CodeSender = Arc<Mutex<Option<oneshot::Sender<String>>>>;

/// Certificate and private key (PEM) for the listener.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    /// Certificate chain file.
    pub cert: PathBuf,
    /// Private key file.
    pub key: PathBuf,
}

impl TlsMaterial {
    /// Creates TLS material from file paths.
    #[must_use]
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// Loads the files into a server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if either file is absent. This is a
    /// startup precondition, not something to retry.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>> {
        for path in [&self.cert, &self.key] {
            if !path.exists() {
                return Err(Error::config_missing(
                    format!("TLS file {}", path.display()),
                    "The redirect listener needs a certificate and key, e.g. \
                     `openssl req -x509 -newkey rsa:2048 -nodes -days 3650 \
                     -subj /CN=localhost -keyout server.key -out server.cert`.",
                ));
            }
        }

        let certs = CertificateDer::pem_file_iter(&self.cert)
            .and_then(Iterator::collect::<std::result::Result<Vec<_>, _>>)
            .map_err(|e| {
                Error::InvalidConfig(format!("cannot read {}: {e}", self.cert.display()))
            })?;
        let key = PrivateKeyDer::from_pem_file(&self.key).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {e}", self.key.display()))
        })?;

        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(Arc::new(config))
    }
}

/// Returns the loopback socket address a redirect URI points at.
///
/// `localhost` maps to `127.0.0.1`; IP literals must be loopback.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for non-loopback hosts.
pub fn loopback_addr(redirect: &Url) -> Result<SocketAddr> {
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| Error::InvalidConfig(format!("redirect URI has no port: {redirect}")))?;

    let ip = match redirect.host() {
        Some(url::Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Some(url::Host::Ipv4(ip)) if ip.is_loopback() => IpAddr::V4(ip),
        Some(url::Host::Ipv6(ip)) if ip.is_loopback() => IpAddr::V6(ip),
        _ => {
            return Err(Error::InvalidConfig(format!(
                "redirect URI must point at the loopback interface: {redirect}"
            )));
        }
    };

    Ok(SocketAddr::new(ip, port))
}

/// Short-lived HTTPS listener that captures one redirect.
pub struct CallbackListener {
    listener: TcpListener,
    tls: RustlsConfig,
}

impl std::fmt::Debug for CallbackListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackListener")
            .field("local_addr", &self.listener.local_addr().ok())
            .finish_non_exhaustive()
    }
}

impl CallbackListener {
    /// Binds the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS material is missing or invalid, or if the
    /// address cannot be bound.
    pub async fn bind(addr: SocketAddr, tls: &TlsMaterial) -> Result<Self> {
        let tls = RustlsConfig::from_config(tls.server_config()?);
        let listener = tokio::net::TcpListener::bind(addr).await?.into_std()?;
        debug!(%addr, "redirect listener bound");
        Ok(Self { listener, tls })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until one GET request arrives, then stops.
    ///
    /// Returns the request's `code` parameter (empty if it had none), or
    /// `None` if `timeout` elapsed first. The socket is closed when this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the server stops on its own.
    pub async fn wait_for_code(self, timeout: Option<Duration>) -> Result<Option<String>> {
        let (code_tx, code_rx) = oneshot::channel();
        let app = callback_router(Arc::new(Mutex::new(Some(code_tx))));

        let handle = Handle::new();
        let server = axum_server::from_tcp_rustls(self.listener, self.tls)
            .handle(handle.clone())
            .serve(app.into_make_service());
        let mut serving = tokio::spawn(server);

        let received = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, code_rx).await.ok(),
                None => Some(code_rx.await),
            }
        };

        let outcome = tokio::select! {
            received = received => received,
            served = &mut serving => {
                served.map_err(std::io::Error::other)??;
                return Err(Error::Io(std::io::Error::other(
                    "redirect listener stopped before a redirect arrived",
                )));
            }
        };

        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        match serving.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "redirect listener shut down with an error"),
            Err(e) => debug!(error = %e, "redirect listener task failed"),
        }

        match outcome {
            Some(Ok(code)) => {
                info!("redirect received, listener stopped");
                Ok(Some(code))
            }
            Some(Err(_)) => Err(Error::Io(std::io::Error::other(
                "redirect listener dropped the captured code",
            ))),
            None => {
                warn!(?timeout, "no redirect received before the listener timed out");
                Ok(None)
            }
        }
    }
}

/// Routes `GET` on every path to [`capture_code`].
fn callback_router(code_tx: CodeSender) -> Router {
    Router::new()
        .route("/", get(capture_code))
        .route("/{*path}", get(capture_code))
        .with_state(code_tx)
}

async fn capture_code(
    State(code_tx): State<CodeSender>,
    Query(params): Query<HashMap<String, String>>,
) -> &'static str {
    // Only the first captured request counts.
    if let Some(sender) = code_tx.lock().await.take() {
        let code = params.get("code").cloned().unwrap_or_default();
        let _ = sender.send(code);
    }
    SUCCESS_BODY
}
