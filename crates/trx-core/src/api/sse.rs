use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde_json::Value;

use super::types::{Action, Observation, QueryResponse, Thought};
use super::{ApiError, ApiErrorKind, ApiResult};

/// Typed events delivered over the query stream.
///
/// `Complete` and `Error` are mutually exclusive terminal events; at most one
/// occurs per channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Thought(Thought),
    Action(Action),
    Observation(Observation),
    Complete(Box<QueryResponse>),
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete(_) | StreamEvent::Error { .. })
    }
}

/// SSE parser that converts a byte stream into `StreamEvent`s.
pub(crate) struct SseParser<S> {
    inner: EventStream<S>,
}

impl<S> SseParser<S> {
    pub(crate) fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
        }
    }
}

impl<S, E> Stream for SseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ApiResult<StreamEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                Poll::Ready(Some(parse_event_fields(&event.event, &event.data)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(ApiError::new(
                ApiErrorKind::Connect,
                format!("SSE stream error: {e}"),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn parse_event_fields(event_type: &str, data: &str) -> ApiResult<StreamEvent> {
    let data = data.trim();

    match event_type {
        "thought" => {
            let thought: Thought = serde_json::from_str(data)
                .map_err(|err| ApiError::parse(format!("failed to parse thought: {err}")))?;
            Ok(StreamEvent::Thought(thought))
        }
        "action" => {
            let action: Action = serde_json::from_str(data)
                .map_err(|err| ApiError::parse(format!("failed to parse action: {err}")))?;
            Ok(StreamEvent::Action(action))
        }
        "observation" => {
            let observation: Observation = serde_json::from_str(data)
                .map_err(|err| ApiError::parse(format!("failed to parse observation: {err}")))?;
            Ok(StreamEvent::Observation(observation))
        }
        "complete" => {
            let response: QueryResponse = serde_json::from_str(data)
                .map_err(|err| ApiError::parse(format!("failed to parse complete: {err}")))?;
            Ok(StreamEvent::Complete(Box::new(response)))
        }
        "error" => Ok(StreamEvent::Error {
            message: parse_error_payload(data),
        }),
        other => Err(ApiError::parse(format!("unknown SSE event type: {other}"))),
    }
}

/// The backend sends error payloads as `{"error": "..."}`; older builds sent
/// a bare string.
fn parse_error_payload(data: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(data) {
        if let Some(msg) = json
            .get("error")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str)
        {
            return msg.to_string();
        }
        if let Some(msg) = json.as_str() {
            return msg.to_string();
        }
    }
    if data.is_empty() {
        "stream failed".to_string()
    } else {
        data.to_string()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    /// SSE fixture simulating a short two-iteration agent run.
    const SSE_TRACE: &str = r#"event: thought
data: {"iteration":0,"timestamp":"t0","content":{"thought":"find the station","reasoning":"need the id first"}}

event: action
data: {"iteration":0,"timestamp":"t0","action":{"function_name":"search_station","parameters":{"name":"Union"},"reason":"lookup"}}

event: observation
data: {"iteration":0,"timestamp":"t0","function":"search_station","parameters":{"name":"Union"},"result":{"id":42},"result_summary":"found station 42"}

event: thought
data: {"iteration":1,"timestamp":"t1","content":{"thought":"answer"}}

event: complete
data: {"success":true,"answer":"Station 42.","metadata":{"session_id":"session_abc","user_id":"u","iterations":2,"functions_used":1,"timestamp":"t1"},"thoughts":[],"actions":[],"observations":[]}

"#;

    const SSE_ERROR: &str = r#"event: thought
data: {"iteration":0,"timestamp":"t0","content":{"thought":"hm"}}

event: error
data: {"error":"model backend unavailable"}

"#;

    /// Helper to create a mock byte stream from a string
    fn mock_byte_stream(
        data: &str,
    ) -> impl Stream<Item = std::result::Result<bytes::Bytes, std::io::Error>> {
        let chunks: Vec<_> = data
            .as_bytes()
            .chunks(50) // Simulate chunked delivery
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        futures_util::stream::iter(chunks)
    }

    #[tokio::test]
    async fn parses_full_trace_stream() {
        let mut parser = SseParser::new(mock_byte_stream(SSE_TRACE));

        let mut events = Vec::new();
        while let Some(result) = parser.next().await {
            events.push(result.expect("expected valid event"));
        }

        assert_eq!(events.len(), 5);
        assert!(
            matches!(&events[0], StreamEvent::Thought(t) if t.iteration == 0 && t.content.thought == "find the station")
        );
        assert!(
            matches!(&events[1], StreamEvent::Action(a) if a.action.function_name == "search_station")
        );
        assert!(
            matches!(&events[2], StreamEvent::Observation(o) if o.result_summary == "found station 42")
        );
        assert!(matches!(&events[3], StreamEvent::Thought(t) if t.iteration == 1));
        match &events[4] {
            StreamEvent::Complete(resp) => {
                assert!(resp.success);
                assert_eq!(resp.answer, "Station 42.");
                assert_eq!(resp.metadata.iterations, 2);
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parses_error_event() {
        let mut parser = SseParser::new(mock_byte_stream(SSE_ERROR));

        let mut events = Vec::new();
        while let Some(result) = parser.next().await {
            events.push(result.expect("expected valid event"));
        }

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            StreamEvent::Error {
                message: "model backend unavailable".to_string()
            }
        );
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn malformed_payload_yields_parse_error() {
        let data = "event: thought\ndata: {not json}\n\n";
        let mut parser = SseParser::new(mock_byte_stream(data));

        let err = parser.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
        assert!(err.message.contains("thought"));
    }

    #[tokio::test]
    async fn unknown_event_name_yields_parse_error() {
        let data = "event: heartbeat\ndata: {}\n\n";
        let mut parser = SseParser::new(mock_byte_stream(data));

        let err = parser.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
        assert!(err.message.contains("heartbeat"));
    }

    #[tokio::test]
    async fn handles_events_split_across_chunks() {
        let data = "event: error\ndata: {\"error\":\"boom\"}\n\n";
        let chunks: Vec<std::result::Result<bytes::Bytes, std::io::Error>> = data
            .as_bytes()
            .chunks(7) // Very small chunks
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        let mut parser = SseParser::new(futures_util::stream::iter(chunks));

        let event = parser.next().await.unwrap().unwrap();
        assert_eq!(
            event,
            StreamEvent::Error {
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn error_payload_fallbacks() {
        assert_eq!(parse_error_payload(r#"{"error":"x"}"#), "x");
        assert_eq!(parse_error_payload(r#"{"message":"y"}"#), "y");
        assert_eq!(parse_error_payload(r#""bare""#), "bare");
        assert_eq!(parse_error_payload("plain text"), "plain text");
        assert_eq!(parse_error_payload(""), "stream failed");
    }
}
