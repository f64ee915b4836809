//! Session command handlers (history, delete).

use anyhow::{Context, Result};
use trx_core::api::ApiClient;
use trx_core::config::Config;

pub async fn history(config: &Config, session_id: &str) -> Result<()> {
    let client = ApiClient::new(config).context("create API client")?;
    let history = client
        .session_history(session_id)
        .await
        .with_context(|| format!("fetch history for {session_id}"))?;

    let output = serde_json::json!({
        "session_id": history.session_id,
        "short_term_memory": history.short_term_memory,
        "long_term_memory": history.long_term_memory,
        "metadata": history.metadata,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub async fn delete(config: &Config, session_id: &str) -> Result<()> {
    let client = ApiClient::new(config).context("create API client")?;
    let ack = client
        .delete_session(session_id)
        .await
        .with_context(|| format!("delete session {session_id}"))?;
    println!("{}", ack.message);
    Ok(())
}
