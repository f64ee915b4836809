//! Tracing setup for the two frontends.
//!
//! One-shot commands log to stderr. The TUI logs to a file under the TRX
//! home instead, so tracing output never corrupts the alternate screen.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use trx_core::config::paths;

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Stderr logging for one-shot commands. Quiet by default; RUST_LOG overrides.
pub fn init_command_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// File logging for the TUI. The returned guard must stay alive for the
/// duration of the TUI run or buffered lines are lost.
pub fn init_tui_logging() -> Result<WorkerGuard> {
    let logs_dir = paths::logs_dir();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("create logs directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "trx.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
