//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O and task spawning only (no direct UI mutations).
//!
//! This keeps the reducer pure: it only mutates state and returns effects,
//! never performs I/O or spawns tasks directly.

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug, PartialEq, Eq)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Submit a query (streaming or batch, per the configured mode).
    SubmitQuery { query: String },

    /// Cancel the in-flight query task (closes the channel).
    CancelQuery,

    /// Clear the stored session id; the next submit creates a fresh session.
    ResetSession,
}
