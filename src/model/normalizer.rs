//! Raw entry normalization.
//!
//! Maps loosely-typed journal entries onto the canonical `Message` model.
//! Entries with no identifier, no parseable timestamp, or of a kind that
//! carries no conversational meaning are dropped here, not errored.

use chrono::{DateTime, Utc};

use crate::journal::{AssistantEntry, RawBlock, RawContent, RawEntry, SystemEntry, UserEntry};

use super::message::{ContentBlock, Message, MessageContent, MessageKind};
use super::usage::TokenUsage;

/// Name of the subtask-invoking tool.
pub const TASK_TOOL: &str = "Task";

/// Normalize a batch of `(line, entry)` pairs, preserving order.
#[must_use]
pub fn normalize_entries(entries: &[(usize, RawEntry)]) -> Vec<Message> {
    entries
        .iter()
        .filter_map(|(line, entry)| normalize_entry(*line, entry))
        .collect()
}

/// Normalize one raw entry into a canonical message.
///
/// Returns `None` for entry kinds with no conversational meaning (summary,
/// snapshot, queue operation, unknown) and for conversational entries missing
/// an identifier or a valid timestamp.
#[must_use]
pub fn normalize_entry(line: usize, entry: &RawEntry) -> Option<Message> {
    match entry {
        RawEntry::User(user) => normalize_user(line, user),
        RawEntry::Assistant(assistant) => normalize_assistant(line, assistant),
        RawEntry::System(system) => normalize_system(line, system),
        RawEntry::Summary(_)
        | RawEntry::FileHistorySnapshot(_)
        | RawEntry::QueueOperation(_)
        | RawEntry::Unknown => None,
    }
}

fn normalize_user(line: usize, user: &UserEntry) -> Option<Message> {
    let id = user.uuid.clone()?;
    let timestamp = parse_timestamp(line, user.timestamp.as_deref())?;
    let message = user.message.as_ref()?;

    Some(Message {
        id,
        parent_id: user.parent_uuid.clone(),
        kind: MessageKind::User,
        timestamp,
        line,
        content: convert_content(&message.content),
        usage: message.usage.map(TokenUsage::from),
        model: message.model.clone(),
        cwd: user.cwd.clone(),
        git_branch: user.git_branch.clone(),
        is_meta: user.is_meta.unwrap_or(false),
        source_tool_use_id: user.source_tool_use_id.clone(),
        tool_use_result: user.tool_use_result.clone(),
    })
}

fn normalize_assistant(line: usize, assistant: &AssistantEntry) -> Option<Message> {
    let id = assistant.uuid.clone()?;
    let timestamp = parse_timestamp(line, assistant.timestamp.as_deref())?;
    let message = assistant.message.as_ref()?;

    Some(Message {
        id,
        parent_id: assistant.parent_uuid.clone(),
        kind: MessageKind::Assistant,
        timestamp,
        line,
        content: convert_content(&message.content),
        usage: message.usage.map(TokenUsage::from),
        model: message.model.clone(),
        cwd: assistant.cwd.clone(),
        git_branch: assistant.git_branch.clone(),
        is_meta: false,
        source_tool_use_id: None,
        tool_use_result: None,
    })
}

fn normalize_system(line: usize, system: &SystemEntry) -> Option<Message> {
    let id = system.uuid.clone()?;
    let timestamp = parse_timestamp(line, system.timestamp.as_deref())?;

    Some(Message {
        id,
        parent_id: system.parent_uuid.clone(),
        kind: MessageKind::System,
        timestamp,
        line,
        content: MessageContent::Text(system.content.clone().unwrap_or_default()),
        usage: None,
        model: None,
        cwd: system.cwd.clone(),
        git_branch: system.git_branch.clone(),
        is_meta: system.is_meta.unwrap_or(false),
        source_tool_use_id: None,
        tool_use_result: None,
    })
}

fn parse_timestamp(line: usize, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(line, timestamp = raw, error = %e, "Dropping entry with invalid timestamp");
            None
        }
    }
}

/// Convert wire content into the canonical shape. Plain text stays plain
/// text; unknown block types are dropped from block sequences.
fn convert_content(content: &RawContent) -> MessageContent {
    match content {
        RawContent::Text(s) => MessageContent::Text(s.clone()),
        RawContent::Blocks(blocks) => MessageContent::Blocks(
            blocks
                .iter()
                .filter_map(|block| match block {
                    RawBlock::Text { text } => Some(ContentBlock::Text { text: text.clone() }),
                    RawBlock::Thinking { thinking } => Some(ContentBlock::Thinking {
                        thinking: thinking.clone(),
                    }),
                    RawBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    }),
                    RawBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => Some(ContentBlock::ToolResult {
                        tool_use_id: tool_use_id.clone(),
                        content: content.clone(),
                        is_error: is_error.unwrap_or(false),
                    }),
                    RawBlock::Unknown => None,
                })
                .collect(),
        ),
    }
}
