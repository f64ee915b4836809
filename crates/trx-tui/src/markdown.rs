//! Markdown rendering for agent answers.
//!
//! Parses markdown with pulldown-cmark and converts it into styled ratatui
//! lines. Block wrapping is left to `Paragraph::wrap`; this module only
//! decides line breaks between blocks and the style of each span.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Renders markdown text into styled lines.
///
/// Plain text passes through unchanged (a paragraph per block), so this is
/// safe to call on answers that contain no markdown at all.
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    if text.is_empty() {
        return vec![Line::default()];
    }

    let mut renderer = MarkdownLines::default();
    for event in Parser::new(text) {
        renderer.process(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct MarkdownLines {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    in_code_block: bool,
    /// (ordered counter, if ordered) per nesting level.
    list_stack: Vec<Option<u64>>,
}

impl MarkdownLines {
    fn style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_span(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    fn blank_line(&mut self) {
        if !self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn list_prefix(&mut self) {
        let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
        let marker = match self.list_stack.last_mut() {
            Some(Some(n)) => {
                let marker = format!("{n}. ");
                *n += 1;
                marker
            }
            _ => "• ".to_string(),
        };
        self.current.push(Span::styled(
            format!("{indent}{marker}"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    fn process(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    // Code blocks keep their own line structure.
                    let style = self.style();
                    for line in text.trim_end_matches('\n').split('\n') {
                        self.push_span("  ", Style::default());
                        self.push_span(line, style);
                        self.flush();
                    }
                } else {
                    let style = self.style();
                    self.push_span(&text, style);
                }
            }
            Event::Code(code) => {
                self.push_span(
                    &code,
                    Style::default().fg(Color::Yellow).bg(Color::Black),
                );
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push_span(" ", style);
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(marker, Style::default().fg(Color::DarkGray));
            }
            // HTML is skipped to avoid control sequences reaching the
            // terminal; math and footnotes are not supported.
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.blank_line();
                let style = match level {
                    HeadingLevel::H1 => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                    HeadingLevel::H2 => Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                self.style_stack.push(style);
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                self.in_code_block = true;
                let fence = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => format!("```{lang}"),
                    _ => "```".to_string(),
                };
                self.lines.push(Line::from(Span::styled(
                    fence,
                    Style::default().fg(Color::DarkGray),
                )));
                self.style_stack.push(Style::default().fg(Color::Green));
            }
            Tag::List(start) => {
                self.flush();
                self.list_stack.push(start);
            }
            Tag::Item => {
                self.flush();
                self.list_prefix();
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.style_stack
                    .push(Style::default().fg(Color::DarkGray));
            }
            Tag::Emphasis => {
                self.style_stack
                    .push(self.style().add_modifier(Modifier::ITALIC));
            }
            Tag::Strong => {
                self.style_stack
                    .push(self.style().add_modifier(Modifier::BOLD));
            }
            Tag::Link { .. } => {
                self.style_stack.push(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush();
                self.style_stack.pop();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.in_code_block = false;
                self.style_stack.pop();
                self.lines.push(Line::from(Span::styled(
                    "```",
                    Style::default().fg(Color::DarkGray),
                )));
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush();
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.style_stack.pop();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link => {
                self.style_stack.pop();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_text(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn plain_text_passes_through() {
        let lines = render_markdown("just plain text");
        assert_eq!(flat_text(&lines), "just plain text");
    }

    #[test]
    fn empty_input_yields_one_line() {
        assert_eq!(render_markdown("").len(), 1);
    }

    #[test]
    fn heading_is_bold() {
        let lines = render_markdown("# Title");
        let has_bold = lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.style.add_modifier.contains(Modifier::BOLD)));
        assert!(has_bold);
    }

    #[test]
    fn code_block_keeps_line_structure() {
        let lines = render_markdown("```rust\nfn main() {\n    body\n}\n```");
        let text = flat_text(&lines);
        assert!(text.contains("```rust"));
        assert!(text.contains("    body"));
        assert!(text.ends_with("```"));
    }

    #[test]
    fn lists_get_bullets_and_numbers() {
        let text = flat_text(&render_markdown("- a\n- b"));
        assert!(text.contains("• a"));
        let text = flat_text(&render_markdown("1. a\n2. b"));
        assert!(text.contains("1. a"));
        assert!(text.contains("2. b"));
    }

    #[test]
    fn inline_code_styled_separately() {
        let lines = render_markdown("use `trx ask`");
        let has_code_span = lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.content == "trx ask"));
        assert!(has_code_span);
    }
}
