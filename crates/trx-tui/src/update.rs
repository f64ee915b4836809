//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(state, event)`
//! and executes the returned effects.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use trx_core::api::ApiError;
use trx_core::api::StreamEvent;

use crate::effects::UiEffect;
use crate::events::{QueryEvent, UiEvent};
use crate::state::AppState;

/// The main reducer function.
pub fn update(state: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            state.spinner_frame = state.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(state, &term_event),
        UiEvent::Query { generation, event } => {
            // A superseded task (cancelled or replaced by a new submission)
            // may still flush events it had already resolved. Those carry an
            // old generation and must not touch the current query's state.
            if generation != state.query_generation {
                return vec![];
            }
            handle_query_event(state, event)
        }
    }
}

fn handle_terminal_event(state: &mut AppState, event: &Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(state, key),
        Event::Paste(text) => {
            state.input.push_str(text);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(state: &mut AppState, key: &KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match (key.code, ctrl) {
        (KeyCode::Char('c'), true) => vec![UiEffect::Quit],
        (KeyCode::Char('n'), true) => {
            // Session reset: close any stream, drop all trace state, next
            // submit creates a fresh session.
            state.controller.reset();
            state.session_id = None;
            state.scroll = 0;
            state.query_generation += 1;
            vec![UiEffect::CancelQuery, UiEffect::ResetSession]
        }
        (KeyCode::Char('r'), true) => {
            state.show_raw = !state.show_raw;
            vec![]
        }
        (KeyCode::Esc, _) => {
            if state.controller.is_loading() {
                // Cancel in-flight query; the partial trace stays visible.
                state.controller.cancel();
                state.query_generation += 1;
                vec![UiEffect::CancelQuery]
            } else {
                vec![]
            }
        }
        (KeyCode::Enter, _) => submit(state),
        (KeyCode::Backspace, _) => {
            state.input.pop();
            vec![]
        }
        (KeyCode::Up, _) | (KeyCode::PageUp, _) => {
            state.scroll = state.scroll.saturating_sub(scroll_amount(key.code));
            vec![]
        }
        (KeyCode::Down, _) | (KeyCode::PageDown, _) => {
            state.scroll = state.scroll.saturating_add(scroll_amount(key.code));
            vec![]
        }
        (KeyCode::Char(c), false) => {
            state.input.push(c);
            vec![]
        }
        _ => vec![],
    }
}

fn scroll_amount(code: KeyCode) -> u16 {
    match code {
        KeyCode::PageUp | KeyCode::PageDown => 10,
        _ => 1,
    }
}

fn submit(state: &mut AppState) -> Vec<UiEffect> {
    let query = state.input.trim().to_string();
    if query.is_empty() || state.controller.is_loading() {
        return vec![];
    }
    state.input.clear();
    state.scroll = 0;
    state.query_generation += 1;

    state.controller.begin();
    if state.config.mode.is_batch() {
        state.controller.batch_dispatched();
    }
    vec![UiEffect::SubmitQuery { query }]
}

fn handle_query_event(state: &mut AppState, event: QueryEvent) -> Vec<UiEffect> {
    match event {
        QueryEvent::SessionReady { session_id } => {
            state.session_id = Some(session_id);
        }
        QueryEvent::Opened => state.controller.streaming_opened(),
        QueryEvent::Stream(stream_event) => {
            if let StreamEvent::Complete(resp) = &stream_event
                && !resp.metadata.session_id.is_empty()
            {
                state.session_id = Some(resp.metadata.session_id.clone());
            }
            state.controller.on_stream_event(stream_event);
        }
        QueryEvent::BatchSettled(response) => {
            if !response.metadata.session_id.is_empty() {
                state.session_id = Some(response.metadata.session_id.clone());
            }
            state.controller.on_batch_result(Ok(*response));
        }
        QueryEvent::Fatal { message } => {
            state.controller.on_fatal(&ApiError::agent(message));
        }
    }
    vec![]
}

#[cfg(test)]
mod tests {
    use trx_core::api::types::{QueryResponse, ResponseMetadata, Thought, ThoughtContent};
    use trx_core::config::{Config, QueryMode};
    use trx_core::controller::{QueryOutcome, QueryPhase};

    use super::*;

    fn key(code: KeyCode) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn ctrl_key(c: char) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(
            KeyCode::Char(c),
            KeyModifiers::CONTROL,
        )))
    }

    fn state() -> AppState {
        AppState::new(Config::default())
    }

    /// Feeds a task event stamped with the current generation.
    fn send_query(s: &mut AppState, event: QueryEvent) -> Vec<UiEffect> {
        let generation = s.query_generation;
        update(s, UiEvent::Query { generation, event })
    }

    fn thought(iteration: u32) -> Thought {
        Thought {
            iteration,
            timestamp: String::new(),
            content: ThoughtContent::default(),
        }
    }

    fn response() -> QueryResponse {
        QueryResponse {
            success: true,
            answer: "done".into(),
            metadata: ResponseMetadata {
                session_id: "session_feed".into(),
                ..Default::default()
            },
            thoughts: Vec::new(),
            actions: Vec::new(),
            observations: Vec::new(),
            full_state: None,
        }
    }

    #[test]
    fn typing_and_enter_submits_once() {
        let mut s = state();
        for c in "hi".chars() {
            update(&mut s, key(KeyCode::Char(c)));
        }
        let effects = update(&mut s, key(KeyCode::Enter));
        assert_eq!(
            effects,
            vec![UiEffect::SubmitQuery {
                query: "hi".into()
            }]
        );
        assert!(s.input.is_empty());
        assert_eq!(s.controller.phase(), QueryPhase::Dispatching);

        // While loading, Enter does nothing.
        s.input = "again".into();
        assert!(update(&mut s, key(KeyCode::Enter)).is_empty());
    }

    #[test]
    fn empty_input_does_not_submit() {
        let mut s = state();
        assert!(update(&mut s, key(KeyCode::Enter)).is_empty());
        s.input = "   ".into();
        assert!(update(&mut s, key(KeyCode::Enter)).is_empty());
    }

    #[test]
    fn batch_mode_submits_into_awaiting_batch() {
        let mut s = state();
        s.config.mode = QueryMode::Batch;
        s.input = "q".into();
        update(&mut s, key(KeyCode::Enter));
        assert_eq!(s.controller.phase(), QueryPhase::AwaitingBatch);
    }

    #[test]
    fn esc_cancels_only_while_loading() {
        let mut s = state();
        assert!(update(&mut s, key(KeyCode::Esc)).is_empty());

        s.input = "q".into();
        update(&mut s, key(KeyCode::Enter));
        send_query(&mut s, QueryEvent::Opened);
        send_query(&mut s, QueryEvent::Stream(StreamEvent::Thought(thought(0))));

        let effects = update(&mut s, key(KeyCode::Esc));
        assert_eq!(effects, vec![UiEffect::CancelQuery]);
        assert_eq!(s.controller.phase(), QueryPhase::Idle);
        // Partial trace retained after cancel.
        assert_eq!(s.controller.trace().len(), 1);
    }

    #[test]
    fn ctrl_n_resets_session_and_trace() {
        let mut s = state();
        s.session_id = Some("session_x".into());
        s.input = "q".into();
        update(&mut s, key(KeyCode::Enter));
        send_query(&mut s, QueryEvent::Opened);

        let effects = update(&mut s, ctrl_key('n'));
        assert_eq!(effects, vec![UiEffect::CancelQuery, UiEffect::ResetSession]);
        assert!(s.session_id.is_none());
        assert_eq!(s.controller.phase(), QueryPhase::Idle);
        assert!(s.controller.trace().is_empty());
    }

    #[test]
    fn cancelled_task_events_do_not_reach_the_next_query() {
        let mut s = state();
        s.input = "first".into();
        update(&mut s, key(KeyCode::Enter));
        let old_generation = s.query_generation;
        send_query(&mut s, QueryEvent::Opened);

        // Cancel the first query, then submit a fresh one.
        update(&mut s, key(KeyCode::Esc));
        s.input = "second".into();
        update(&mut s, key(KeyCode::Enter));
        send_query(&mut s, QueryEvent::Opened);
        assert!(s.controller.trace().is_empty());

        // The cancelled task had already resolved a thought before it saw
        // the cancellation; it arrives late in the inbox.
        update(
            &mut s,
            UiEvent::Query {
                generation: old_generation,
                event: QueryEvent::Stream(StreamEvent::Thought(thought(0))),
            },
        );
        assert!(s.controller.trace().is_empty());

        // A stale fatal must not settle the new query as failed either.
        update(
            &mut s,
            UiEvent::Query {
                generation: old_generation,
                event: QueryEvent::Fatal {
                    message: "stream closed".into(),
                },
            },
        );
        assert_eq!(s.controller.phase(), QueryPhase::Streaming);
        assert!(s.controller.error().is_none());

        // Current-generation events still land.
        send_query(&mut s, QueryEvent::Stream(StreamEvent::Thought(thought(0))));
        assert_eq!(s.controller.trace().len(), 1);
    }

    #[test]
    fn stale_fatal_after_cancel_leaves_idle_state_alone() {
        let mut s = state();
        s.input = "q".into();
        update(&mut s, key(KeyCode::Enter));
        let old_generation = s.query_generation;
        send_query(&mut s, QueryEvent::Opened);
        update(&mut s, key(KeyCode::Esc));

        update(
            &mut s,
            UiEvent::Query {
                generation: old_generation,
                event: QueryEvent::Fatal {
                    message: "closed by cancel".into(),
                },
            },
        );
        assert_eq!(s.controller.phase(), QueryPhase::Idle);
        assert!(s.controller.error().is_none());
    }

    #[test]
    fn fatal_event_settles_failure_and_clears_loading() {
        let mut s = state();
        s.input = "q".into();
        update(&mut s, key(KeyCode::Enter));
        send_query(&mut s, QueryEvent::Opened);
        send_query(&mut s, QueryEvent::Stream(StreamEvent::Thought(thought(0))));
        send_query(&mut s, QueryEvent::Stream(StreamEvent::Thought(thought(1))));

        send_query(
            &mut s,
            QueryEvent::Fatal {
                message: "connection lost".into(),
            },
        );
        assert_eq!(
            s.controller.phase(),
            QueryPhase::Settled(QueryOutcome::Failure)
        );
        assert!(!s.controller.is_loading());
        // The two steps materialized before the failure remain visible.
        assert_eq!(s.controller.trace().len(), 2);
        assert_eq!(s.controller.error(), Some("connection lost"));
    }

    #[test]
    fn complete_adopts_session_id_from_metadata() {
        let mut s = state();
        s.input = "q".into();
        update(&mut s, key(KeyCode::Enter));
        send_query(&mut s, QueryEvent::Opened);
        send_query(
            &mut s,
            QueryEvent::Stream(StreamEvent::Complete(Box::new(response()))),
        );
        assert_eq!(s.session_id.as_deref(), Some("session_feed"));
        assert_eq!(
            s.controller.phase(),
            QueryPhase::Settled(QueryOutcome::Success)
        );
    }

    #[test]
    fn ctrl_r_toggles_raw_view() {
        let mut s = state();
        assert!(!s.show_raw);
        update(&mut s, ctrl_key('r'));
        assert!(s.show_raw);
        update(&mut s, ctrl_key('r'));
        assert!(!s.show_raw);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut s = state();
        assert_eq!(update(&mut s, ctrl_key('c')), vec![UiEffect::Quit]);
    }
}
