//! Query controller: the per-query state machine.
//!
//! `Idle -> Dispatching -> (Streaming | AwaitingBatch) -> Settled`.
//!
//! The controller is pure state: I/O (session creation, the channel itself)
//! lives with the caller, which feeds results back in through the `on_*`
//! methods. This keeps cancellation and terminal-state handling explicit
//! transitions instead of nested callbacks, and makes the machine testable
//! without a backend.

use serde_json::Value;

use crate::aggregator::{Step, TraceAggregator, materialize_steps};
use crate::api::types::QueryResponse;
use crate::api::{ApiError, StreamEvent};

/// Where a settled query ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Success,
    Failure,
}

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Idle,
    Dispatching,
    Streaming,
    AwaitingBatch,
    Settled(QueryOutcome),
}

impl QueryPhase {
    /// True while a query is in flight (the UI shows a loading indicator).
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            QueryPhase::Dispatching | QueryPhase::Streaming | QueryPhase::AwaitingBatch
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueryPhase::Idle => "idle",
            QueryPhase::Dispatching => "dispatching",
            QueryPhase::Streaming => "streaming",
            QueryPhase::AwaitingBatch => "waiting",
            QueryPhase::Settled(QueryOutcome::Success) => "done",
            QueryPhase::Settled(QueryOutcome::Failure) => "failed",
        }
    }
}

/// Orchestrates one query end-to-end and decides the source of truth for the
/// displayed trace.
#[derive(Debug)]
pub struct QueryController {
    phase: QueryPhase,
    aggregator: TraceAggregator,
    response: Option<QueryResponse>,
    error: Option<String>,
}

impl Default for QueryController {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryController {
    pub fn new() -> Self {
        Self {
            phase: QueryPhase::Idle,
            aggregator: TraceAggregator::new(),
            response: None,
            error: None,
        }
    }

    pub fn phase(&self) -> QueryPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// `Idle/Settled -> Dispatching`: a new submission clears partial state
    /// and any previous terminal response. The caller must have closed any
    /// previous channel before calling this.
    pub fn begin(&mut self) {
        self.aggregator.reset();
        self.response = None;
        self.error = None;
        self.phase = QueryPhase::Dispatching;
    }

    /// `Dispatching -> Streaming`: the channel is open.
    pub fn streaming_opened(&mut self) {
        self.phase = QueryPhase::Streaming;
    }

    /// `Dispatching -> AwaitingBatch`: the synchronous call was issued.
    pub fn batch_dispatched(&mut self) {
        self.phase = QueryPhase::AwaitingBatch;
    }

    /// Feeds one channel event in. Trace events are ingested; `Complete`
    /// settles the query with the payload as the authoritative record.
    pub fn on_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Thought(thought) => self.aggregator.push_thought(thought),
            StreamEvent::Action(action) => self.aggregator.push_action(action),
            StreamEvent::Observation(observation) => {
                self.aggregator.push_observation(observation);
            }
            StreamEvent::Complete(response) => self.settle_success(*response),
            StreamEvent::Error { message } => self.on_fatal(&ApiError::agent(message)),
        }
    }

    /// `-> Settled(Failure)`: fatal channel error or request failure. The
    /// partial trace ingested so far is retained so the user still sees the
    /// progress made before the failure.
    pub fn on_fatal(&mut self, error: &ApiError) {
        self.error = Some(error.message.clone());
        self.phase = QueryPhase::Settled(QueryOutcome::Failure);
    }

    /// Settles the batch path with the synchronous call's result.
    pub fn on_batch_result(&mut self, result: Result<QueryResponse, ApiError>) {
        match result {
            Ok(response) => self.settle_success(response),
            Err(err) => self.on_fatal(&err),
        }
    }

    fn settle_success(&mut self, response: QueryResponse) {
        // A domain-level failure inside an otherwise-successful response is
        // surfaced but does not stop the response from being authoritative.
        self.error = response.metadata.error.clone();
        self.response = Some(response);
        self.phase = QueryPhase::Settled(QueryOutcome::Success);
    }

    /// User-initiated cancellation: back to a non-loading state, partial
    /// trace retained. The caller closes the channel.
    pub fn cancel(&mut self) {
        if self.is_loading() {
            self.phase = QueryPhase::Idle;
        }
    }

    /// Full reset (session reset path): discards partial state, response and
    /// error.
    pub fn reset(&mut self) {
        self.aggregator.reset();
        self.response = None;
        self.error = None;
        self.phase = QueryPhase::Idle;
    }

    /// The authoritative response, once settled successfully.
    pub fn response(&self) -> Option<&QueryResponse> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The displayed trace. While streaming this is the materialized partial
    /// state; once an authoritative response exists its own arrays replace
    /// the locally aggregated ones (swap, not merge).
    pub fn trace(&self) -> Vec<Step> {
        match &self.response {
            Some(resp) => materialize_steps(&resp.thoughts, &resp.actions, &resp.observations),
            None => self.aggregator.materialize(),
        }
    }

    /// Raw data view: `full_state` when the authoritative response carries
    /// one, otherwise the canonical arrays (or the live partial arrays while
    /// streaming).
    pub fn raw_view(&self) -> Value {
        match &self.response {
            Some(resp) => match &resp.full_state {
                Some(state) => state.clone(),
                None => serde_json::json!({
                    "thoughts": resp.thoughts,
                    "actions": resp.actions,
                    "observations": resp.observations,
                }),
            },
            None => self.aggregator.as_raw_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{
        Action, ActionCall, Observation, ResponseMetadata, Thought, ThoughtContent,
    };

    fn thought(iteration: u32, text: &str) -> Thought {
        Thought {
            iteration,
            timestamp: String::new(),
            content: ThoughtContent {
                thought: text.to_string(),
                ..Default::default()
            },
        }
    }

    fn action(iteration: u32) -> Action {
        Action {
            iteration,
            timestamp: String::new(),
            action: ActionCall::default(),
        }
    }

    fn response(answer: &str) -> QueryResponse {
        QueryResponse {
            success: true,
            answer: answer.to_string(),
            metadata: ResponseMetadata::default(),
            thoughts: vec![thought(0, "authoritative")],
            actions: Vec::new(),
            observations: Vec::new(),
            full_state: None,
        }
    }

    #[test]
    fn streaming_happy_path_transitions() {
        let mut ctl = QueryController::new();
        assert_eq!(ctl.phase(), QueryPhase::Idle);

        ctl.begin();
        assert_eq!(ctl.phase(), QueryPhase::Dispatching);
        assert!(ctl.is_loading());

        ctl.streaming_opened();
        assert_eq!(ctl.phase(), QueryPhase::Streaming);

        ctl.on_stream_event(StreamEvent::Thought(thought(0, "partial")));
        assert_eq!(ctl.trace().len(), 1);

        ctl.on_stream_event(StreamEvent::Complete(Box::new(response("done"))));
        assert_eq!(ctl.phase(), QueryPhase::Settled(QueryOutcome::Success));
        assert!(!ctl.is_loading());
        assert_eq!(ctl.response().unwrap().answer, "done");
    }

    #[test]
    fn authoritative_response_replaces_partial_trace() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.streaming_opened();

        // Partial state differs from what the response will carry.
        ctl.on_stream_event(StreamEvent::Thought(thought(0, "partial")));
        ctl.on_stream_event(StreamEvent::Thought(thought(1, "partial two")));
        assert_eq!(ctl.trace().len(), 2);

        ctl.on_stream_event(StreamEvent::Complete(Box::new(response("ok"))));

        // The response has one thought; the displayed trace swaps to it.
        let steps = ctl.trace();
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0].thought.as_ref().unwrap().content.thought,
            "authoritative"
        );
    }

    #[test]
    fn fatal_error_retains_partial_trace() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.streaming_opened();
        ctl.on_stream_event(StreamEvent::Thought(thought(0, "a")));
        ctl.on_stream_event(StreamEvent::Action(action(0)));
        ctl.on_stream_event(StreamEvent::Thought(thought(1, "b")));
        assert_eq!(ctl.trace().len(), 2);

        ctl.on_stream_event(StreamEvent::Error {
            message: "backend died".to_string(),
        });

        assert_eq!(ctl.phase(), QueryPhase::Settled(QueryOutcome::Failure));
        assert!(!ctl.is_loading());
        assert_eq!(ctl.error(), Some("backend died"));
        // Progress made before the failure stays visible.
        assert_eq!(ctl.trace().len(), 2);
        assert!(ctl.response().is_none());
    }

    #[test]
    fn new_submission_clears_previous_state() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.streaming_opened();
        ctl.on_stream_event(StreamEvent::Thought(thought(0, "old")));
        ctl.on_stream_event(StreamEvent::Complete(Box::new(response("old answer"))));

        ctl.begin();
        assert!(ctl.trace().is_empty());
        assert!(ctl.response().is_none());
        assert!(ctl.error().is_none());
    }

    #[test]
    fn batch_path_bypasses_aggregator() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.batch_dispatched();
        assert_eq!(ctl.phase(), QueryPhase::AwaitingBatch);

        ctl.on_batch_result(Ok(response("batch answer")));
        assert_eq!(ctl.phase(), QueryPhase::Settled(QueryOutcome::Success));
        assert_eq!(ctl.trace().len(), 1);
    }

    #[test]
    fn batch_failure_settles_with_error() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.batch_dispatched();
        ctl.on_batch_result(Err(ApiError::http_status(502, "")));

        assert_eq!(ctl.phase(), QueryPhase::Settled(QueryOutcome::Failure));
        assert_eq!(ctl.error(), Some("HTTP 502"));
    }

    #[test]
    fn metadata_error_is_surfaced_but_response_stays_authoritative() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.streaming_opened();

        let mut resp = response("partial answer");
        resp.metadata.error = Some("function budget exceeded".to_string());
        ctl.on_stream_event(StreamEvent::Complete(Box::new(resp)));

        assert_eq!(ctl.phase(), QueryPhase::Settled(QueryOutcome::Success));
        assert_eq!(ctl.error(), Some("function budget exceeded"));
        assert!(ctl.response().is_some());
    }

    #[test]
    fn cancel_returns_to_idle_keeping_trace() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.streaming_opened();
        ctl.on_stream_event(StreamEvent::Thought(thought(0, "a")));

        ctl.cancel();
        assert_eq!(ctl.phase(), QueryPhase::Idle);
        assert_eq!(ctl.trace().len(), 1);

        // Cancel when not loading is a no-op.
        ctl.cancel();
        assert_eq!(ctl.phase(), QueryPhase::Idle);
    }

    #[test]
    fn raw_view_prefers_full_state() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.streaming_opened();
        ctl.on_stream_event(StreamEvent::Thought(thought(0, "a")));

        // While streaming: partial arrays.
        assert_eq!(ctl.raw_view()["thoughts"].as_array().unwrap().len(), 1);

        let mut resp = response("ok");
        resp.full_state = Some(serde_json::json!({"debug": true}));
        ctl.on_stream_event(StreamEvent::Complete(Box::new(resp)));

        assert_eq!(ctl.raw_view(), serde_json::json!({"debug": true}));
    }

    #[test]
    fn reset_discards_everything() {
        let mut ctl = QueryController::new();
        ctl.begin();
        ctl.streaming_opened();
        ctl.on_stream_event(StreamEvent::Thought(thought(0, "a")));
        ctl.on_stream_event(StreamEvent::Error {
            message: "x".to_string(),
        });

        ctl.reset();
        assert_eq!(ctl.phase(), QueryPhase::Idle);
        assert!(ctl.trace().is_empty());
        assert!(ctl.error().is_none());
    }
}
