//! Claude Code hook payload and question extraction.

use serde::Deserialize;

use crate::error::{NamerError, Result};

/// JSON payload received from the Stop hook on stdin.
///
/// Only `conversation` is read; other fields Claude Code sends
/// (`session_id`, `cwd`, `hook_event_name`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HookPayload {
    pub conversation: Vec<Entry>,
}

/// One element of `conversation`. Objects that are not shaped like a message
/// (non-string role, a bare string, a number) land in `Other` and are skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Message(Message),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: MessageContent,
}

/// Message content is either a bare string or a list of typed blocks.
/// `null` and any other shape carry no text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentItem>),
    Other(serde_json::Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Other(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentItem {
    Block(ContentBlock),
    Other(serde_json::Value),
}

/// A single content block. Non-text blocks (tool_use, tool_result, image)
/// keep only their type tag; a block without one is never text.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl HookPayload {
    /// Parse the raw stdin body.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(NamerError::MalformedInput("empty input".into()));
        }
        serde_json::from_str(input).map_err(|e| NamerError::MalformedInput(e.to_string()))
    }

    /// Parse raw stdin bytes. Invalid UTF-8 is malformed input.
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(input)
            .map_err(|e| NamerError::MalformedInput(format!("stdin is not valid UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// The last `limit` user questions, oldest first.
    ///
    /// Text blocks of one message are joined with a newline; messages with no
    /// text are dropped before the limit is applied.
    pub fn recent_questions(&self, limit: usize) -> Vec<String> {
        let questions: Vec<String> = self
            .conversation
            .iter()
            .filter_map(|entry| match entry {
                Entry::Message(m) if m.role == "user" => m.content.text(),
                _ => None,
            })
            .collect();

        let start = questions.len().saturating_sub(limit);
        questions[start..].to_vec()
    }
}

impl MessageContent {
    fn text(&self) -> Option<String> {
        let joined = match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Blocks(items) => items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::Block(b) if b.kind == "text" => Some(b),
                    _ => None,
                })
                .filter_map(|b| b.text.as_deref())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Other(_) => String::new(),
        };
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
