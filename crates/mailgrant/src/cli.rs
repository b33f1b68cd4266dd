//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `OAuth2` token helper for Microsoft 365 IMAP/SMTP.
#[derive(Debug, Parser)]
#[command(name = "mailgrant", version, about)]
pub struct Cli {
    /// Config file (default: <config dir>/mailgrant/config.toml)
    #[arg(long, global = true, env = "MAILGRANT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in through the browser and store the refresh token.
    Authorize {
        /// Skip the redirect listener and paste the redirected URL instead
        #[arg(long)]
        no_listener: bool,
    },
    /// Redeem the stored refresh token for a fresh access token.
    Refresh {
        /// Print the access token on stdout (e.g. for msmtp `passwordeval`)
        #[arg(long)]
        print: bool,
    },
    /// List the newest messages in the inbox.
    Inbox {
        /// Mailbox owner
        #[arg(long, env = "MAILGRANT_USER")]
        user: Option<String>,

        /// Number of messages to show
        #[arg(long, default_value_t = 15)]
        limit: usize,
    },
    /// Send a plain-text message.
    Send {
        /// Sender address, also the mailbox owner
        #[arg(long, env = "MAILGRANT_USER")]
        user: Option<String>,

        /// Recipients
        #[arg(long, value_delimiter = ',')]
        to: Vec<String>,

        /// Subject line
        #[arg(long)]
        subject: Option<String>,

        /// Message body
        #[arg(long)]
        body: Option<String>,
    },
}
