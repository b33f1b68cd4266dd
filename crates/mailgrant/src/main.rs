//! `mailgrant` - `OAuth2` token helper for Microsoft 365 IMAP/SMTP.
//!
//! Obtains and rotates the refresh token, hands out access tokens to other
//! programs, and can list the inbox or send a message with them.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;
mod config;
mod message;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for `refresh --print`.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mailgrant=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // reqwest and the redirect listener share one process-wide provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    commands::run(cli.command, &config).await
}
