//! The query stream channel.
//!
//! Wraps the SSE parser with the channel contract from the error taxonomy:
//! per-message decode failures are logged and dropped (the connection stays
//! open), while transport failures and the `error` event are fatal and
//! surfaced exactly once. After a terminal event the channel is closed and no
//! further events are delivered.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::warn;

use super::sse::{SseParser, StreamEvent};
use super::{ApiError, ApiErrorKind, ApiResult};

type ByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> + Send>>;

/// Handle for one open query channel.
///
/// Dropping the handle (or calling [`QueryStream::close`]) cancels delivery
/// immediately for the local consumer; the remote producer may keep working.
pub struct QueryStream {
    events: SseParser<ByteStream>,
    closed: bool,
}

impl QueryStream {
    pub(crate) fn new<S>(bytes: S) -> Self
    where
        S: Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            events: SseParser::new(Box::pin(bytes) as ByteStream),
            closed: false,
        }
    }

    /// Returns the next event, or `None` once the channel is closed.
    ///
    /// Terminal events (`Complete` or a fatal error) close the channel as a
    /// side effect. Transient decode failures never surface here; they are
    /// logged at `warn` and the next well-formed event is returned instead.
    pub async fn next_event(&mut self) -> Option<ApiResult<StreamEvent>> {
        while !self.closed {
            match self.events.next().await {
                None => {
                    // EOF without complete/error is a transport failure.
                    self.closed = true;
                    return Some(Err(ApiError::new(
                        ApiErrorKind::Connect,
                        "stream ended without a terminal event",
                    )));
                }
                Some(Ok(StreamEvent::Error { message })) => {
                    self.closed = true;
                    return Some(Err(ApiError::agent(message)));
                }
                Some(Ok(event)) => {
                    if event.is_terminal() {
                        self.closed = true;
                    }
                    return Some(Ok(event));
                }
                Some(Err(err)) if err.is_transient() => {
                    warn!(error = %err, "dropping malformed stream message");
                }
                Some(Err(err)) => {
                    self.closed = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }

    /// Closes the channel. Idempotent; closing an already-closed handle is a
    /// no-op.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
