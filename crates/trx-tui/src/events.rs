//! UI event types.
//!
//! Events are collected by the runtime each frame (terminal input, query
//! task results from the inbox, ticks) and fed through the reducer.

use trx_core::api::StreamEvent;
use trx_core::api::types::QueryResponse;

/// Events processed by the reducer.
#[derive(Debug)]
pub enum UiEvent {
    /// Frame cadence tick (drives spinner and render coalescing).
    Tick,
    /// Raw terminal input.
    Terminal(crossterm::event::Event),
    /// Result from a spawned query task, stamped with the generation the
    /// task was spawned under. A cancelled task can still flush an already
    /// resolved event into the inbox; the stamp lets the reducer drop it.
    Query { generation: u64, event: QueryEvent },
}

/// Messages sent by the query task into the runtime inbox.
#[derive(Debug)]
pub enum QueryEvent {
    /// Session id is known (created or reused).
    SessionReady { session_id: String },
    /// The SSE channel is open; events will follow.
    Opened,
    /// One channel event (trace record or terminal `Complete`).
    Stream(StreamEvent),
    /// The synchronous batch call returned.
    BatchSettled(Box<QueryResponse>),
    /// Fatal failure: request error, transport failure, or `error` event.
    Fatal { message: String },
}
