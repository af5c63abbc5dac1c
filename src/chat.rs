//! Transcript types and message content parsing.
//!
//! Nothing here knows about the terminal; `ui.rs` turns [`Segment`]s into
//! styled lines.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Append-only list of exchanged messages
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Result of the last connectivity check or failed send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub detail: Option<String>,
}

impl ConnectionStatus {
    pub fn ok() -> Self {
        Self {
            ok: true,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

/// A piece of message content, either prose or a fenced code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code {
        language: Option<String>,
        code: String,
    },
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").expect("fence pattern is valid"))
}

pub fn has_code_fence(content: &str) -> bool {
    content.contains("```")
}

/// Splits content into prose and fenced code blocks, in order. Blank prose
/// between blocks is dropped. A fence that never closes stays prose.
pub fn segments(content: &str) -> Vec<Segment> {
    if !has_code_fence(content) {
        return vec![Segment::Text(content.to_string())];
    }

    let mut out = Vec::new();
    let mut last = 0;

    for caps in fence_regex().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };

        let before = &content[last..whole.start()];
        if !before.trim().is_empty() {
            out.push(Segment::Text(before.trim_matches('\n').to_string()));
        }

        out.push(Segment::Code {
            language: caps.get(1).map(|m| m.as_str().to_string()),
            code: caps
                .get(2)
                .map(|m| m.as_str().trim_end_matches('\n').to_string())
                .unwrap_or_default(),
        });
        last = whole.end();
    }

    let rest = &content[last..];
    if !rest.trim().is_empty() {
        out.push(Segment::Text(rest.trim_matches('\n').to_string()));
    }

    out
}
