//! Application configuration.
//!
//! One TOML file with an `[oauth]` table (see [`Settings`]) and a `[mail]`
//! table with the server endpoints. Every key is optional.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mailgrant_oauth::{Error as OAuthError, Settings};
use serde::{Deserialize, Serialize};

/// Directory under the platform config dir.
const APP_DIR: &str = "mailgrant";
/// Config file name inside [`APP_DIR`].
const CONFIG_FILE: &str = "config.toml";

/// IMAP and SMTP endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// IMAP server (implicit TLS).
    pub imap_host: String,
    /// IMAP port.
    pub imap_port: u16,
    /// SMTP submission server (STARTTLS).
    pub smtp_host: String,
    /// SMTP submission port.
    pub smtp_port: u16,
    /// Name sent in EHLO.
    pub ehlo_name: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            imap_host: "outlook.office365.com".to_string(),
            imap_port: 993,
            smtp_host: "smtp.office365.com".to_string(),
            smtp_port: 587,
            ehlo_name: "localhost".to_string(),
        }
    }
}

/// Everything read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OAuth client settings.
    pub oauth: Settings,
    /// Mail server endpoints.
    pub mail: MailSettings,
}

impl AppConfig {
    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, the file in the platform
    /// config directory is used when present, otherwise the defaults.
    /// Relative token and certificate paths resolve against the directory
    /// of the file that was read.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(OAuthError::config_missing(
                    format!("Config file {}", path.display()),
                    "Check the --config path.",
                )
                .into());
            }
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|path| path.exists()),
        };

        let Some(path) = path else {
            tracing::debug!("no config file, using built-in defaults");
            return Ok(Self::default());
        };

        let config = Self::from_file(&path)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parses one config file and resolves its relative paths.
    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.oauth = config.oauth.resolved_against(base);
        }
        Ok(config)
    }
}

/// `<config dir>/mailgrant/config.toml`, if the platform has a config dir.
fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
