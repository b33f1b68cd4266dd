//! `mailgrant refresh`

use anyhow::Context;

use crate::config::AppConfig;

/// Rotates the stored tokens, printing the access token when asked.
pub async fn run(config: &AppConfig, print: bool) -> anyhow::Result<()> {
    let access_token = super::lifecycle(&config.oauth)?
        .refresh()
        .await
        .context("token refresh failed")?;

    if print {
        println!("{access_token}");
    } else {
        tracing::info!("tokens refreshed");
    }
    Ok(())
}
