//! File-backed token persistence.
//!
//! Two independent plain-text files, each holding exactly one token with no
//! trailing structure. Every successful exchange rewrites them wholesale.
//! There is no locking: concurrent invocations racing on the same files are
//! not supported.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use tracing::debug;

/// Persists the refresh token and the most recent access token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    refresh_path: PathBuf,
    access_path: PathBuf,
    authorize_hint: String,
}

impl TokenStore {
    /// Creates a store over the two token files.
    #[must_use]
    pub fn new(refresh_path: impl Into<PathBuf>, access_path: impl Into<PathBuf>) -> Self {
        Self {
            refresh_path: refresh_path.into(),
            access_path: access_path.into(),
            authorize_hint: "Run the authorization step first.".to_string(),
        }
    }

    /// Sets the message shown when the refresh token file is missing.
    #[must_use]
    pub fn with_authorize_hint(mut self, hint: impl Into<String>) -> Self {
        self.authorize_hint = hint.into();
        self
    }

    /// Path of the refresh token file.
    #[must_use]
    pub fn refresh_path(&self) -> &Path {
        &self.refresh_path
    }

    /// Path of the access token file.
    #[must_use]
    pub fn access_path(&self) -> &Path {
        &self.access_path
    }

    /// Reads the stored refresh token, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if the file does not exist, meaning
    /// the initial authorization has not run yet.
    pub fn read_refresh_token(&self) -> Result<String> {
        match fs::read_to_string(&self.refresh_path) {
            Ok(contents) => Ok(contents.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::config_missing(
                format!("Refresh token file {}", self.refresh_path.display()),
                self.authorize_hint.clone(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the refresh token file's content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_refresh_token(&self, value: &str) -> Result<()> {
        write_secret(&self.refresh_path, value)?;
        debug!(path = %self.refresh_path.display(), "refresh token written");
        Ok(())
    }

    /// Replaces the access token file's content.
    ///
    /// The file is a cache for external consumers; it is never read back.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_access_token(&self, value: &str) -> Result<()> {
        write_secret(&self.access_path, value)?;
        debug!(path = %self.access_path.display(), "access token written");
        Ok(())
    }
}

/// Create-or-truncate write, owner-only on Unix.
fn write_secret(path: &Path, value: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(value.as_bytes())?;
    file.flush()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> TokenStore {
        TokenStore::new(dir.path().join("refresh"), dir.path().join("access"))
    }

    #[test]
    fn test_missing_refresh_token_is_config_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).with_authorize_hint("Run `mailgrant authorize` first.");

        match store.read_refresh_token() {
            Err(Error::ConfigMissing { what, hint }) => {
                assert!(what.contains("refresh"));
                assert_eq!(hint, "Run `mailgrant authorize` first.");
            }
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_read_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.refresh_path(), "  rt-123\n").unwrap();

        assert_eq!(store.read_refresh_token().unwrap(), "rt-123");
    }

    #[test]
    fn test_write_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.write_refresh_token("a-much-longer-first-token").unwrap();
        store.write_refresh_token("short").unwrap();

        assert_eq!(fs::read_to_string(store.refresh_path()).unwrap(), "short");
    }

    #[test]
    fn test_access_token_file_is_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.write_refresh_token("rt").unwrap();
        store.write_access_token("at").unwrap();

        assert_eq!(fs::read_to_string(store.refresh_path()).unwrap(), "rt");
        assert_eq!(fs::read_to_string(store.access_path()).unwrap(), "at");
    }

    #[cfg(unix)]
    #[test]
    fn test_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write_refresh_token("rt").unwrap();

        let mode = fs::metadata(store.refresh_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
