//! The canonical message record and its content model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::normalizer::TASK_TOOL;
use super::usage::TokenUsage;

/// Conversational role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
    System,
}

/// A normalized content block. Source order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Option<serde_json::Value>,
        is_error: bool,
    },
}

/// Message content. Plain text is never force-converted into blocks, so
/// consumers can tell "never had blocks" apart from an empty block sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Rendered text: the plain string, or all text blocks joined.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    #[must_use]
    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }
}

/// A subtask-invoking tool call, with its declared description and type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInvocation {
    pub tool_use_id: String,
    pub description: Option<String>,
    pub subagent_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// The canonical unit after normalization.
///
/// Every message has a non-empty kind and a valid timestamp; entries that
/// cannot satisfy that are dropped by the normalizer and never reach this
/// type.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub parent_id: Option<String>,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    /// 1-based line in the source log file.
    pub line: usize,
    pub content: MessageContent,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
    pub cwd: Option<String>,
    pub git_branch: Option<String>,
    /// Internal/meta messages never start a conversation turn.
    pub is_meta: bool,
    /// Tool-use id this message answers, for tool-result wrappers.
    pub source_tool_use_id: Option<String>,
    /// Enriched result payload attached by the agent runtime.
    pub tool_use_result: Option<serde_json::Value>,
}

impl Message {
    /// Rendered text of the content.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.as_text()
    }

    /// Tool calls carried by this message.
    ///
    /// Only assistant-authored block sequences carry tool calls; any other
    /// shape yields nothing.
    pub fn tool_calls(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        let blocks = if self.kind == MessageKind::Assistant {
            self.content.blocks()
        } else {
            &[]
        };
        blocks.iter().filter_map(|b| match b {
            ContentBlock::ToolCall { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            }
            _ => None,
        })
    }

    /// Tool results carried by this message.
    ///
    /// Only user-authored block sequences carry tool results.
    pub fn tool_results(&self) -> impl Iterator<Item = (&str, Option<&serde_json::Value>, bool)> {
        let blocks = if self.kind == MessageKind::User {
            self.content.blocks()
        } else {
            &[]
        };
        blocks.iter().filter_map(|b| match b {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some((tool_use_id.as_str(), content.as_ref(), *is_error)),
            _ => None,
        })
    }

    /// Subtask-invoking tool calls, with declared description/type captured.
    #[must_use]
    pub fn task_invocations(&self) -> Vec<TaskInvocation> {
        self.tool_calls()
            .filter(|(_, name, _)| *name == TASK_TOOL)
            .map(|(id, _, input)| TaskInvocation {
                tool_use_id: id.to_string(),
                description: input
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                subagent_type: input
                    .get("subagent_type")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                timestamp: self.timestamp,
            })
            .collect()
    }
}
