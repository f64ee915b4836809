//! Splits `<think>...</think>` segments out of an answer body.
//!
//! The agent's final answer sometimes embeds its chain-of-thought in
//! `<think>` tags. The UI shows those segments as a visually distinct
//! "thinking" block above the answer body instead of inline.

/// An answer split into thinking segments and the remaining body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerParts {
    /// Extracted `<think>` segments, in order of appearance.
    pub thinking: Vec<String>,
    /// The answer with thinking segments removed.
    pub body: String,
}

/// Extracts all `<think>...</think>` segments from `answer`.
///
/// An unterminated `<think>` consumes the rest of the answer as thinking,
/// matching how a streamed answer looks while the tag is still open.
pub fn split_thinking(answer: &str) -> AnswerParts {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut thinking = Vec::new();
    let mut body = String::new();
    let mut rest = answer;

    while let Some(start) = rest.find(OPEN) {
        body.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        match after_open.find(CLOSE) {
            Some(end) => {
                push_segment(&mut thinking, &after_open[..end]);
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                push_segment(&mut thinking, after_open);
                rest = "";
            }
        }
    }
    body.push_str(rest);

    AnswerParts {
        thinking,
        body: body.trim().to_string(),
    }
}

fn push_segment(segments: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}
