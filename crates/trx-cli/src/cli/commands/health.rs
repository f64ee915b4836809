//! Health command handler.

use anyhow::{Context, Result};
use trx_core::api::ApiClient;
use trx_core::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let client = ApiClient::new(config).context("create API client")?;
    match client.health().await {
        Ok(status) if status.is_healthy() => {
            println!("{} ({})", status.status, client.base_url());
            Ok(())
        }
        Ok(status) => anyhow::bail!("backend reports status '{}'", status.status),
        Err(err) => Err(anyhow::Error::new(err))
            .with_context(|| format!("backend unreachable at {}", config.base_url)),
    }
}
