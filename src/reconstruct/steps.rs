//! Semantic steps and token accounting.
//!
//! A turn's responses break down into finer-grained steps for drill-down:
//! thinking blocks, text output, tool call/result pairs, and subagent
//! references. Two accounting strategies coexist and produce materially
//! different per-step numbers, so both are kept as named variants instead of
//! being merged.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ContentBlock, Message};

use super::turns::ConversationTurn;

/// Baseline context estimate seeded before the first step of a turn.
pub const CONTEXT_BASELINE: u64 = 10_000;

/// How per-step token numbers are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccountingStrategy {
    /// Attribute each message's prompt-side counters wholly to the message;
    /// individual steps contribute nothing.
    MessageLevel,
    /// Distribute each message's total usage across its steps proportionally
    /// to rendered content length, with a running accumulated-context
    /// counter.
    #[default]
    Proportional,
}

/// What one step represents.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Thinking {
        text: String,
    },
    TextOutput {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
        result: Option<serde_json::Value>,
        is_error: bool,
    },
    SubagentRef {
        agent_id: String,
    },
}

/// One drill-down unit with its token attribution.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticStep {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: StepKind,
    /// Token share allotted to this step.
    pub tokens: u64,
    /// Running context estimate after this step.
    pub accumulated_context: u64,
}

/// Break a turn's responses into semantic steps under a strategy.
#[must_use]
pub fn build_steps(turn: &ConversationTurn, strategy: AccountingStrategy) -> Vec<SemanticStep> {
    let results = collect_tool_results(turn);
    let linked: Vec<(&str, &str)> = turn
        .subagents
        .iter()
        .filter_map(|a| {
            a.linked_tool_use_id
                .as_deref()
                .map(|id| (id, a.agent_id.as_str()))
        })
        .collect();

    let mut steps = Vec::new();
    let mut accumulated = CONTEXT_BASELINE;

    for message in &turn.responses {
        let raw = raw_steps(message, &results, &linked);
        match strategy {
            AccountingStrategy::MessageLevel => {
                let context = message.usage.map(|u| u.context_size()).unwrap_or(0);
                for (kind, _) in raw {
                    steps.push(SemanticStep {
                        message_id: message.id.clone(),
                        timestamp: message.timestamp,
                        kind,
                        tokens: 0,
                        accumulated_context: context,
                    });
                }
            }
            AccountingStrategy::Proportional => {
                let total = message.usage.map(|u| u.total()).unwrap_or(0);
                let shares = distribute(total, &raw.iter().map(|(_, len)| *len).collect::<Vec<_>>());
                for ((kind, _), tokens) in raw.into_iter().zip(shares) {
                    accumulated = accumulated.saturating_add(tokens);
                    steps.push(SemanticStep {
                        message_id: message.id.clone(),
                        timestamp: message.timestamp,
                        kind,
                        tokens,
                        accumulated_context: accumulated,
                    });
                }
            }
        }
    }

    steps
}

/// Index tool results recorded in the turn's window by tool-use id.
fn collect_tool_results(
    turn: &ConversationTurn,
) -> Vec<(String, Option<serde_json::Value>, bool)> {
    turn.others
        .iter()
        .flat_map(|m| {
            m.tool_results()
                .map(|(id, content, is_error)| (id.to_string(), content.cloned(), is_error))
        })
        .collect()
}

/// Extract `(kind, rendered_length)` pairs from one response message.
fn raw_steps(
    message: &Message,
    results: &[(String, Option<serde_json::Value>, bool)],
    linked: &[(&str, &str)],
) -> Vec<(StepKind, usize)> {
    message
        .content
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Thinking { thinking } => Some((
                StepKind::Thinking {
                    text: thinking.clone(),
                },
                thinking.len(),
            )),
            ContentBlock::Text { text } => Some((
                StepKind::TextOutput { text: text.clone() },
                text.len(),
            )),
            ContentBlock::ToolCall { id, name, input } => {
                let paired = results.iter().find(|(rid, _, _)| rid == id);
                let result = paired.and_then(|(_, content, _)| content.clone());
                let is_error = paired.is_some_and(|(_, _, e)| *e);
                let length = json_len(input) + result.as_ref().map_or(0, json_len);

                let kind = match linked.iter().find(|(tid, _)| tid == id) {
                    Some((_, agent_id)) => StepKind::SubagentRef {
                        agent_id: (*agent_id).to_string(),
                    },
                    None => StepKind::ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                        result,
                        is_error,
                    },
                };
                Some((kind, length))
            }
            ContentBlock::ToolResult { .. } => None,
        })
        .collect()
}

fn json_len(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::String(s) => s.len(),
        other => other.to_string().len(),
    }
}

/// Split `total` across steps proportionally to `lengths`, falling back to
/// an even split when nothing has measurable length.
fn distribute(total: u64, lengths: &[usize]) -> Vec<u64> {
    if lengths.is_empty() {
        return Vec::new();
    }
    let total_len: usize = lengths.iter().sum();
    if total_len == 0 {
        let share = total / lengths.len() as u64;
        return vec![share; lengths.len()];
    }
    lengths
        .iter()
        .map(|len| total * *len as u64 / total_len as u64)
        .collect()
}
