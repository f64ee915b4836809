//! Interactive terminal UI for TRX.
//!
//! Elm-style architecture: a pure `update` reducer over `AppState`, effects
//! executed by the runtime, rendering as a pure function of state.

mod effects;
mod events;
mod markdown;
mod render;
mod runtime;
mod state;
mod terminal;
mod update;

use anyhow::Result;
use trx_core::config::Config;

pub use runtime::TuiRuntime;

/// Runs the TUI until the user quits.
///
/// Must be called within a tokio runtime; query tasks are spawned onto it.
pub fn run(config: Config) -> Result<()> {
    let mut runtime = TuiRuntime::new(config)?;
    runtime.run()
}
