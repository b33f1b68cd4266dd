//! Subcommand implementations.

mod authorize;
mod inbox;
mod refresh;
mod send;

use std::io::{self, BufRead, Write};

use mailgrant_oauth::{Settings, TokenExchanger, TokenLifecycle, TokenStore};

use crate::cli::Command;
use crate::config::AppConfig;

/// Runs one subcommand.
pub async fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Authorize { no_listener } => {
            let ssh_session = std::env::var_os("SSH_CONNECTION").is_some();
            authorize::run(config, listen_for_redirect(no_listener, ssh_session)).await
        }
        Command::Refresh { print } => refresh::run(config, print).await,
        Command::Inbox { user, limit } => {
            let stdin = io::stdin();
            let user = require_user(user, &mut stdin.lock(), &mut io::stdout())?;
            inbox::run(config, &user, limit).await
        }
        Command::Send {
            user,
            to,
            subject,
            body,
        } => {
            let draft = send::Draft {
                user,
                to,
                subject,
                body,
            };
            send::run(config, draft).await
        }
    }
}

/// Builds the token lifecycle for the configured files and provider.
fn lifecycle(settings: &Settings) -> anyhow::Result<TokenLifecycle> {
    let store = TokenStore::new(&settings.refresh_token_file, &settings.access_token_file)
        .with_authorize_hint("Run `mailgrant authorize` first.");
    Ok(TokenLifecycle::new(
        TokenExchanger::from_settings(settings)?,
        store,
    ))
}

/// The browser cannot reach this machine's loopback from across SSH.
const fn listen_for_redirect(no_listener: bool, ssh_session: bool) -> bool {
    !no_listener && !ssh_session
}

/// Prints `label` and reads one trimmed line; EOF reads as empty.
fn prompt(input: &mut impl BufRead, output: &mut impl Write, label: &str) -> io::Result<String> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Returns `user`, asking for it when absent.
fn require_user(
    user: Option<String>,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> anyhow::Result<String> {
    let user = match user {
        Some(user) => user.trim().to_string(),
        None => prompt(input, output, "Your M365 email address: ")?,
    };
    anyhow::ensure!(!user.is_empty(), "No email address provided.");
    Ok(user)
}
