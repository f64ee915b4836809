//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState` by immutable reference, draw to a ratatui
//! frame, and never mutate state or return effects.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use trx_core::aggregator::Step;
use trx_core::controller::{QueryOutcome, QueryPhase};
use trx_core::thinking::split_thinking;
use unicode_width::UnicodeWidthStr;

use crate::markdown::render_markdown;
use crate::state::AppState;

/// Height of the bordered input box.
const INPUT_HEIGHT: u16 = 3;

/// Height of status line below input.
const STATUS_HEIGHT: u16 = 1;

/// Spinner frames for status line animation.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Ticks per spinner frame.
const SPINNER_SPEED_DIVISOR: usize = 4;

/// Renders the entire TUI to the frame.
pub fn render(state: &AppState, frame: &mut Frame) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);

    render_main(state, frame, chunks[0]);
    render_input(state, frame, chunks[1]);
    render_status_line(state, frame, chunks[2]);
}

/// Main pane: reasoning trace plus answer, or the raw data view.
fn render_main(state: &AppState, frame: &mut Frame, area: Rect) {
    let (title, lines) = if state.show_raw {
        (" Raw ", raw_lines(state))
    } else {
        (" Trace ", trace_lines(state))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(title, Style::default().fg(Color::DarkGray)));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0));
    frame.render_widget(paragraph, area);
}

fn raw_lines(state: &AppState) -> Vec<Line<'static>> {
    let value = state.controller.raw_view();
    let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    pretty
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Gray))))
        .collect()
}

fn trace_lines(state: &AppState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for step in state.controller.trace() {
        push_step_lines(&mut lines, &step);
    }

    if let Some(response) = state.controller.response() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        let parts = split_thinking(&response.answer);
        for thinking in &parts.thinking {
            lines.push(Line::from(Span::styled(
                "· thinking",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
            for line in thinking.lines() {
                lines.push(Line::from(Span::styled(
                    format!("  {line}"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
            lines.push(Line::default());
        }
        lines.extend(render_markdown(&parts.body));

        let meta = &response.metadata;
        if meta.iterations > 0 {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!(
                    "{} iterations · {} function calls",
                    meta.iterations, meta.functions_used
                ),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    if let Some(error) = state.controller.error() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            format!("✗ {error}"),
            Style::default().fg(Color::Red),
        )));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Type a query and press Enter.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines
}

fn push_step_lines(lines: &mut Vec<Line<'static>>, step: &Step) {
    lines.push(Line::from(Span::styled(
        format!("── Step {} ", step.iteration + 1),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )));

    match &step.thought {
        Some(thought) => {
            push_labeled(lines, "think", Color::Cyan, &thought.content.thought);
            if !thought.content.reasoning.is_empty() {
                push_labeled(lines, "why", Color::DarkGray, &thought.content.reasoning);
            }
            if let Some(next) = thought.content.next_action.as_str()
                && !next.is_empty()
            {
                push_labeled(lines, "next", Color::DarkGray, next);
            }
        }
        None => push_placeholder(lines, "think"),
    }

    match &step.action {
        Some(action) => {
            let call = &action.action;
            let params = serde_json::to_string(&call.parameters).unwrap_or_default();
            push_labeled(
                lines,
                "act",
                Color::Yellow,
                &format!("{}({params})", call.function_name),
            );
        }
        None => push_placeholder(lines, "act"),
    }

    match &step.observation {
        Some(observation) => {
            let color = if observation.error.is_some() {
                Color::Red
            } else {
                Color::Green
            };
            push_labeled(lines, "obs", color, &observation.summary());
        }
        None => push_placeholder(lines, "obs"),
    }

    lines.push(Line::default());
}

fn push_placeholder(lines: &mut Vec<Line<'static>>, label: &str) {
    lines.push(Line::from(Span::styled(
        format!("{label:>5}  …"),
        Style::default().fg(Color::DarkGray),
    )));
}

fn push_labeled(lines: &mut Vec<Line<'static>>, label: &str, color: Color, text: &str) {
    let mut first = true;
    for line in text.lines() {
        let prefix = if first {
            format!("{label:>5}  ")
        } else {
            "       ".to_string()
        };
        first = false;
        lines.push(Line::from(vec![
            Span::styled(prefix, Style::default().fg(color)),
            Span::raw(line.to_string()),
        ]));
    }
    if first {
        lines.push(Line::from(Span::styled(
            format!("{label:>5}"),
            Style::default().fg(color),
        )));
    }
}

fn render_input(state: &AppState, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Query ", Style::default().fg(Color::Gray)));

    let input = Paragraph::new(state.input.as_str()).block(block);
    frame.render_widget(input, area);

    // Cursor sits after the typed text, inside the border.
    let cursor_x = area.x + 1 + state.input.width() as u16;
    frame.set_cursor_position(Position::new(
        cursor_x.min(area.x + area.width.saturating_sub(2)),
        area.y + 1,
    ));
}

fn render_status_line(state: &AppState, frame: &mut Frame, area: Rect) {
    let phase = state.controller.phase();
    let mut spans: Vec<Span> = Vec::new();

    if phase.is_loading() {
        let spinner_idx = (state.spinner_frame / SPINNER_SPEED_DIVISOR) % SPINNER_FRAMES.len();
        let color = match phase {
            QueryPhase::Streaming => Color::Cyan,
            QueryPhase::AwaitingBatch => Color::Yellow,
            _ => Color::Green,
        };
        spans.extend([
            Span::styled(SPINNER_FRAMES[spinner_idx], Style::default().fg(color)),
            Span::raw(" "),
            Span::styled(phase.label(), Style::default().fg(color)),
            Span::raw("  "),
            Span::styled("Esc", Style::default().fg(Color::DarkGray)),
            Span::raw(" cancel"),
        ]);
    } else {
        let (label, color) = match phase {
            QueryPhase::Settled(QueryOutcome::Failure) => (phase.label(), Color::Red),
            QueryPhase::Settled(QueryOutcome::Success) => (phase.label(), Color::Green),
            _ => (phase.label(), Color::DarkGray),
        };
        spans.extend([
            Span::styled(label, Style::default().fg(color)),
            Span::raw("  "),
            Span::styled("Ctrl+N", Style::default().fg(Color::DarkGray)),
            Span::raw(" new session  "),
            Span::styled("Ctrl+R", Style::default().fg(Color::DarkGray)),
            Span::raw(" raw  "),
            Span::styled("Ctrl+C", Style::default().fg(Color::DarkGray)),
            Span::raw(" quit"),
        ]);
    }

    let session = state.session_id.as_deref().unwrap_or("no session");
    spans.push(Span::styled(
        format!("  {session}"),
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
