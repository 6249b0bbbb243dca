//! Turn grouping.
//!
//! Partitions a session's message stream into conversation turns: one
//! triggering user input plus everything the agent did until the next
//! trigger. Grouping is purely timestamp-window based; parent links are kept
//! on the messages but never tree-walked.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Message, MessageContent, MessageKind, TokenUsage};

use super::subagent::ResolvedSubagent;

/// One user-initiated unit of conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    /// The user message that started this turn.
    pub trigger: Message,
    /// Assistant messages inside the turn's window, in order.
    pub responses: Vec<Message>,
    /// Non-assistant, non-trigger messages inside the window. Not part of
    /// the response sequence proper, but retained for the trigger scanner.
    pub others: Vec<Message>,
    /// Window start: the trigger's timestamp.
    pub start: DateTime<Utc>,
    /// Window end: the next trigger's timestamp, `None` for the final turn.
    pub end: Option<DateTime<Utc>>,
    /// Summed usage of the trigger and every response.
    pub usage: TokenUsage,
    /// Subtasks spawned during this turn, sorted by start time.
    pub subagents: Vec<ResolvedSubagent>,
}

impl ConversationTurn {
    /// Whether a timestamp falls inside this turn's half-open window.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && self.end.map_or(true, |end| ts < end)
    }

    /// Timestamp of the last activity observed in this turn.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.responses
            .iter()
            .chain(self.others.iter())
            .map(|m| m.timestamp)
            .max()
            .unwrap_or(self.start)
    }

    /// Messages in this turn, trigger included.
    #[must_use]
    pub fn message_count(&self) -> usize {
        1 + self.responses.len() + self.others.len()
    }
}

/// Whether a message is a triggering user input.
///
/// A trigger is a user-kind, non-meta message that does not answer a
/// tool-use id, carries no tool-result blocks, and renders to non-empty text
/// that is not a command-output wrapper. Slash-command inputs count as
/// triggers; the output they echo back does not.
#[must_use]
pub fn is_trigger(message: &Message) -> bool {
    if message.kind != MessageKind::User || message.is_meta {
        return false;
    }
    if message.source_tool_use_id.is_some() || message.tool_results().next().is_some() {
        return false;
    }
    let text = match &message.content {
        MessageContent::Text(s) => s.trim().to_string(),
        MessageContent::Blocks(_) => message.text().trim().to_string(),
    };
    if text.is_empty() {
        return false;
    }
    !is_command_output(&text)
}

/// Command-output wrappers echo a local command's stdout back into the log.
fn is_command_output(text: &str) -> bool {
    text.starts_with("<command-output>") || text.starts_with("<local-command-stdout>")
}

/// Group a session's messages into conversation turns.
///
/// For each trigger at time `t_i` the window is `[t_i, t_{i+1})`; a message
/// timestamped exactly at the next trigger belongs to the next turn.
/// Messages earlier than the first trigger fold into the first turn. A
/// stream with no trigger yields no turns.
#[must_use]
pub fn build_turns(messages: &[Message]) -> Vec<ConversationTurn> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_key(|m| (m.timestamp, m.line));

    let trigger_times: Vec<DateTime<Utc>> = sorted
        .iter()
        .filter(|m| is_trigger(m))
        .map(|m| m.timestamp)
        .collect();

    if trigger_times.is_empty() {
        return Vec::new();
    }

    let mut turns: Vec<ConversationTurn> = sorted
        .iter()
        .filter(|m| is_trigger(m))
        .enumerate()
        .map(|(i, m)| ConversationTurn {
            trigger: (*m).clone(),
            responses: Vec::new(),
            others: Vec::new(),
            start: m.timestamp,
            end: trigger_times.get(i + 1).copied(),
            usage: m.usage.unwrap_or_default(),
            subagents: Vec::new(),
        })
        .collect();

    for message in &sorted {
        if is_trigger(message) {
            continue;
        }
        let idx = turn_index(&trigger_times, message.timestamp);
        let turn = &mut turns[idx];
        if message.kind == MessageKind::Assistant {
            turn.usage += message.usage.unwrap_or_default();
            turn.responses.push((*message).clone());
        } else {
            turn.others.push((*message).clone());
        }
    }

    turns
}

/// Index of the turn owning a timestamp: the last trigger at or before it,
/// folding anything earlier than the first trigger into turn zero.
fn turn_index(trigger_times: &[DateTime<Utc>], ts: DateTime<Utc>) -> usize {
    let at_or_before = trigger_times.partition_point(|t| *t <= ts);
    at_or_before.saturating_sub(1)
}
