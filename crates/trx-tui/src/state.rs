//! Application state for the TUI.
//!
//! All query/trace state lives in the core [`QueryController`]; this struct
//! adds only presentation concerns (input line, scroll, raw-view toggle).

use trx_core::config::Config;
use trx_core::controller::QueryController;

pub struct AppState {
    /// Flag indicating the app should quit.
    pub should_quit: bool,
    /// Resolved configuration (base url, user id, query mode).
    pub config: Config,
    /// Current input line.
    pub input: String,
    /// Query state machine (phase, aggregated trace, terminal response).
    pub controller: QueryController,
    /// Active session id, for the status line.
    pub session_id: Option<String>,
    /// Generation of the current query task. Bumped on every submit, cancel
    /// and session reset; events stamped with an older generation are stale
    /// and dropped by the reducer.
    pub query_generation: u64,
    /// Raw data view toggle (Ctrl+R).
    pub show_raw: bool,
    /// Timeline scroll offset, in lines.
    pub scroll: u16,
    /// Spinner animation frame counter.
    pub spinner_frame: usize,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            should_quit: false,
            config,
            input: String::new(),
            controller: QueryController::new(),
            session_id: None,
            query_generation: 0,
            show_raw: false,
            scroll: 0,
            spinner_frame: 0,
        }
    }
}
