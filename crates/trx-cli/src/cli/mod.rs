//! CLI entry and dispatch.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::Parser;
use trx_core::{config, interrupt};

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "trx")]
#[command(version = "0.1")]
#[command(about = "Terminal client for a remote ReAct reasoning agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask the agent a question (streams the reasoning trace)
    Ask {
        /// The query to send
        #[arg(value_name = "QUERY")]
        query: String,

        /// Use the synchronous batch endpoint instead of streaming
        #[arg(long)]
        batch: bool,

        /// Stream the trace even when the config default is batch
        #[arg(long, conflicts_with = "batch")]
        stream: bool,

        /// Reuse an existing session instead of creating one
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,

        /// Override the configured user id
        #[arg(long, value_name = "ID")]
        user: Option<String>,

        /// Generate a fresh user id for this query
        #[arg(long, conflicts_with = "user")]
        new_user: bool,
    },

    /// Show the stored memory for a session
    History {
        /// The ID of the session to inspect
        #[arg(value_name = "SESSION_ID")]
        session_id: String,
    },

    /// List the functions the agent can call
    Functions,

    /// Manage server-side sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Check backend liveness
    Health,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum SessionCommands {
    /// Delete a session and its stored memory
    Delete {
        /// The ID of the session to delete
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // default to the interactive TUI
    let Some(command) = cli.command else {
        if !std::io::stdout().is_terminal() {
            anyhow::bail!("stdout is not a terminal; try `trx ask \"<query>\"`");
        }
        let config = config::Config::load().context("load config")?;
        let _guard = logging::init_tui_logging().context("set up logging")?;
        return trx_tui::run(config);
    };

    logging::init_command_logging();

    let config = config::Config::load().context("load config")?;

    match command {
        Commands::Ask {
            query,
            batch,
            stream,
            session,
            json,
            user,
            new_user,
        } => {
            commands::ask::run(
                commands::ask::AskOptions {
                    query: &query,
                    batch,
                    stream,
                    session: session.as_deref(),
                    json,
                    user: user.as_deref(),
                    new_user,
                },
                &config,
            )
            .await
        }

        Commands::History { session_id } => commands::session::history(&config, &session_id).await,

        Commands::Functions => commands::functions::run(&config).await,

        Commands::Session { command } => match command {
            SessionCommands::Delete { id } => commands::session::delete(&config, &id).await,
        },

        Commands::Health => commands::health::run(&config).await,

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
