//! TUI runtime - owns terminal, runs event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! Query tasks are spawned onto the ambient tokio runtime and send their
//! results into an inbox channel that the event loop drains each frame.

use std::io::Stdout;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trx_core::api::types::QueryRequest;
use trx_core::api::{ApiClient, StreamEvent};
use trx_core::config::Config;
use trx_core::interrupt;
use trx_core::session::SessionContext;

use crate::effects::UiEffect;
use crate::events::{QueryEvent, UiEvent};
use crate::state::AppState;
use crate::{render, terminal, update};

/// Target frame interval while a query is streaming.
pub const FRAME_DURATION: std::time::Duration = std::time::Duration::from_millis(33);

/// Poll duration when idle. Longer timeout reduces CPU usage when nothing is
/// happening.
pub const IDLE_POLL_DURATION: std::time::Duration = std::time::Duration::from_millis(100);

type UiEventSender = mpsc::UnboundedSender<UiEvent>;
type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Full-screen TUI runtime.
///
/// Owns the terminal and state. Runs the event loop and executes effects.
/// Terminal state is guaranteed to be restored on drop, panic, or Ctrl+C.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    /// Inbox sender - query tasks send events here.
    inbox_tx: UiEventSender,
    /// Inbox receiver - runtime drains this each frame.
    inbox_rx: UiEventReceiver,
    client: Arc<ApiClient>,
    session: Arc<SessionContext>,
    /// Cancellation token for the in-flight query task, if any.
    query_cancel: Option<CancellationToken>,
    last_tick: std::time::Instant,
}

impl TuiRuntime {
    /// Creates a new TUI runtime.
    pub fn new(config: Config) -> Result<Self> {
        // Set up panic hook BEFORE entering alternate screen
        terminal::install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = terminal::restore_terminal();
        });

        // Reset interrupt flag in case it was set from a previous run
        interrupt::reset();

        let client = ApiClient::new(&config).context("create API client")?;
        let session = SessionContext::new(config.user_id.clone());

        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state: AppState::new(config),
            inbox_tx,
            inbox_rx,
            client: Arc::new(client),
            session: Arc::new(session),
            query_cancel: None,
            last_tick: std::time::Instant::now(),
        })
    }

    /// Runs the main event loop.
    pub fn run(&mut self) -> Result<()> {
        let mut dirty = true; // Start dirty to ensure initial render

        while !self.state.should_quit {
            // Ctrl+C arrives as a key event in raw mode; the signal handler
            // only fires when the terminal is not in raw mode (e.g. during a
            // brief suspend), in which case we just quit.
            if interrupt::is_interrupted() {
                break;
            }

            let events = self.collect_events()?;

            for event in events {
                // Only Tick triggers render - this caps frame rate at tick
                // cadence; other events batch renders to the next Tick.
                if matches!(&event, UiEvent::Tick) {
                    dirty = true;
                }
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame);
                })?;
                dirty = false;
            }
        }

        Ok(())
    }

    /// Collects events from all sources (terminal, inbox, tick).
    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        // Fast polling while a query is in flight, slow otherwise.
        let tick_interval = if self.state.controller.is_loading() {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        // Drain inbox - all query task results arrive here.
        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        let time_until_tick = tick_interval.saturating_sub(self.last_tick.elapsed());
        let poll_duration = if events.is_empty() {
            time_until_tick
        } else {
            std::time::Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            // Drain any remaining buffered events (non-blocking)
            while event::poll(std::time::Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = std::time::Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }
            UiEffect::CancelQuery => {
                if let Some(cancel) = self.query_cancel.take() {
                    cancel.cancel();
                }
            }
            UiEffect::ResetSession => {
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    session.reset().await;
                });
            }
            UiEffect::SubmitQuery { query } => self.spawn_query(query),
        }
    }

    /// Spawns the query task for one submission.
    ///
    /// Only one live channel may exist per runtime: any previous task is
    /// cancelled first, and anything it still flushes into the inbox carries
    /// an old generation stamp and is dropped by the reducer.
    fn spawn_query(&mut self, query: String) {
        if let Some(cancel) = self.query_cancel.take() {
            cancel.cancel();
        }
        let cancel = CancellationToken::new();
        self.query_cancel = Some(cancel.clone());

        let tx = self.inbox_tx.clone();
        let client = Arc::clone(&self.client);
        let session = Arc::clone(&self.session);
        let user_id = self.state.config.user_id.clone();
        let batch = self.state.config.mode.is_batch();
        // The reducer bumped the generation on submit; events stamped with
        // anything older are dropped on arrival.
        let generation = self.state.query_generation;
        debug!(batch, generation, "dispatching query");

        tokio::spawn(async move {
            let task = QueryTask {
                client,
                session,
                tx,
                cancel,
                generation,
            };
            task.run(query, user_id, batch).await;
        });
    }
}

/// One spawned query task; every event it sends carries its generation.
struct QueryTask {
    client: Arc<ApiClient>,
    session: Arc<SessionContext>,
    tx: UiEventSender,
    cancel: CancellationToken,
    generation: u64,
}

impl QueryTask {
    fn send(&self, event: QueryEvent) {
        let _ = self.tx.send(UiEvent::Query {
            generation: self.generation,
            event,
        });
    }

    async fn run(&self, query: String, user_id: String, batch: bool) {
        let session_id = match self
            .session
            .ensure(|| async {
                self.client
                    .create_session(&user_id)
                    .await
                    .map(|created| created.session_id)
            })
            .await
        {
            Ok(id) => {
                self.send(QueryEvent::SessionReady {
                    session_id: id.clone(),
                });
                id
            }
            Err(err) => {
                warn!(error = %err, "session creation failed");
                self.send(QueryEvent::Fatal {
                    message: err.message,
                });
                return;
            }
        };

        let request = QueryRequest::new(query, user_id).with_session(Some(session_id));

        if batch {
            tokio::select! {
                () = self.cancel.cancelled() => {}
                result = self.client.query(&request) => {
                    let event = match result {
                        Ok(response) => {
                            self.session.adopt(&response.metadata.session_id).await;
                            QueryEvent::BatchSettled(Box::new(response))
                        }
                        Err(err) => QueryEvent::Fatal { message: err.message },
                    };
                    self.send(event);
                }
            }
            return;
        }

        let mut stream = tokio::select! {
            () = self.cancel.cancelled() => return,
            opened = self.client.open_stream(&request) => match opened {
                Ok(stream) => stream,
                Err(err) => {
                    self.send(QueryEvent::Fatal { message: err.message });
                    return;
                }
            }
        };
        self.send(QueryEvent::Opened);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    stream.close();
                    return;
                }
                next = stream.next_event() => match next {
                    None => return,
                    Some(Ok(event)) => {
                        if let StreamEvent::Complete(response) = &event {
                            self.session.adopt(&response.metadata.session_id).await;
                        }
                        self.send(QueryEvent::Stream(event));
                    }
                    Some(Err(err)) => {
                        self.send(QueryEvent::Fatal { message: err.message });
                        return;
                    }
                }
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        if let Some(cancel) = self.query_cancel.take() {
            cancel.cancel();
        }
        let _ = terminal::restore_terminal();
    }
}
