//! Functions command handler.

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use trx_core::api::ApiClient;
use trx_core::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let client = ApiClient::new(config).context("create API client")?;
    let list = client
        .functions()
        .await
        .context("fetch function inventory")?;

    if list.functions.is_empty() {
        println!("No functions exposed by the agent.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["name", "description"]);
    for function in &list.functions {
        table.add_row(vec![&function.name, &function.description]);
    }
    println!("{table}");
    Ok(())
}
