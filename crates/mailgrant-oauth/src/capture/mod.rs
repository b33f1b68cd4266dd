//! Authorization code capture.
//!
//! The user grants consent in a browser, and the provider redirects to the
//! registered loopback URI with `?code=...`. When the session can reach
//! that URI a TLS listener catches the redirect. Otherwise (or when the
//! listener times out) the user pastes the redirected URL by hand.

pub mod listener;
pub mod manual;

use std::fmt;
use std::io::{BufRead, Write};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::authorize::AuthorizationRequest;
use crate::error::Result;

pub use listener::{CallbackListener, TlsMaterial};

/// How an authorization code was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    /// The redirect listener received it.
    Redirect,
    /// The user pasted the redirected URL.
    ManualPaste,
}

/// A captured, single-use authorization code.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedCode {
    /// The code. May be empty if the redirect carried none; the exchange
    /// then fails with the provider's error.
    pub code: String,
    /// Where it came from.
    pub source: CaptureSource,
}

impl fmt::Debug for CapturedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedCode")
            .field("code", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Drives one interactive code capture.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeCapture {
    request: AuthorizationRequest,
    tls: TlsMaterial,
    listen: bool,
    open_browser: bool,
    timeout: Option<Duration>,
}

impl AuthorizationCodeCapture {
    /// Creates a capture that uses the redirect listener.
    #[must_use]
    pub fn new(request: AuthorizationRequest, tls: TlsMaterial) -> Self {
        Self {
            request,
            tls,
            listen: true,
            open_browser: true,
            timeout: Some(Duration::from_secs(300)),
        }
    }

    /// Enables or disables the redirect listener.
    ///
    /// Pass `false` for headless sessions where the browser cannot reach
    /// this machine's loopback interface.
    #[must_use]
    pub const fn listen(mut self, listen: bool) -> Self {
        self.listen = listen;
        self
    }

    /// Enables or disables launching a browser.
    #[must_use]
    pub const fn open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    /// Sets how long the listener waits (`None` waits forever).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the authorization request.
    #[must_use]
    pub const fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// Presents the authorization URL and captures the code.
    ///
    /// Prompts and the URL go to `output`; pasted input is read from
    /// `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot start (e.g. missing TLS
    /// material), or if the pasted URL has no code.
    pub async fn capture<R: BufRead, W: Write>(
        &self,
        input: R,
        mut output: W,
    ) -> Result<CapturedCode> {
        let url = self.request.authorization_url()?;

        // Bind before presenting the URL so a missing certificate fails
        // before the user starts signing in.
        let listener = if self.listen {
            let addr = listener::loopback_addr(&self.request.redirect_url()?)?;
            Some(CallbackListener::bind(addr, &self.tls).await?)
        } else {
            None
        };

        writeln!(output, "Navigate to the following URL in a web browser:")?;
        writeln!(output, "{url}")?;
        output.flush()?;

        if self.open_browser
            && let Err(e) = opener::open_browser(url.as_str())
        {
            debug!(error = %e, "could not launch a browser");
        }

        if let Some(listener) = listener {
            info!(addr = ?listener.local_addr().ok(), "waiting for the redirect");
            match listener.wait_for_code(self.timeout).await? {
                Some(code) => {
                    if code.is_empty() {
                        warn!("redirect carried no authorization code");
                    }
                    return Ok(CapturedCode {
                        code,
                        source: CaptureSource::Redirect,
                    });
                }
                None => info!("falling back to manual paste"),
            }
        }

        let code = manual::prompt_for_code(input, output)?;
        Ok(CapturedCode {
            code,
            source: CaptureSource::ManualPaste,
        })
    }
}
