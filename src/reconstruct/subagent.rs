//! Subagent resolution.
//!
//! Each subtask logs its own JSONL file. Resolution normalizes those files,
//! computes per-subtask spans and usage, infers which subtasks started
//! together, and attaches each to the turn that spawned it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Message, MessageKind, TokenUsage};

use super::turns::ConversationTurn;

/// Width of the start-time bucket used for parallelism detection.
pub const PARALLEL_BUCKET_MS: i64 = 500;

/// Maximum gap between a Task tool-call and a subtask start for linking.
pub const TASK_LINK_WINDOW_MS: i64 = 5_000;

/// One resolved subtask execution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSubagent {
    pub agent_id: String,
    pub messages: Vec<Message>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub usage: TokenUsage,
    /// Task description: inferred from the subtask's own first user message,
    /// overwritten by the spawning tool-call's declared description when one
    /// is linked.
    pub description: Option<String>,
    /// Declared subtask type, when known.
    pub subagent_type: Option<String>,
    /// Started within the same bucket as at least one sibling. A heuristic
    /// for "launched together", not proof of concurrent execution.
    pub is_parallel: bool,
    /// Tool-use id of the Task call linked as this subtask's spawner.
    pub linked_tool_use_id: Option<String>,
}

/// Resolve one subtask from its normalized messages.
///
/// Returns `None` when the message list is empty: a subtask that normalized
/// to nothing is not considered resolved at all.
#[must_use]
pub fn resolve_subagent(agent_id: &str, messages: Vec<Message>) -> Option<ResolvedSubagent> {
    let started_at = messages.iter().map(|m| m.timestamp).min()?;
    let ended_at = messages.iter().map(|m| m.timestamp).max()?;

    let usage = messages
        .iter()
        .filter_map(|m| m.usage)
        .fold(TokenUsage::default(), |acc, u| acc.add(&u));

    let description = messages
        .iter()
        .find(|m| m.kind == MessageKind::User)
        .map(|m| m.text())
        .filter(|text| !text.trim().is_empty());

    Some(ResolvedSubagent {
        agent_id: agent_id.to_string(),
        started_at,
        ended_at,
        duration_ms: (ended_at - started_at).num_milliseconds(),
        usage,
        description,
        subagent_type: None,
        is_parallel: false,
        linked_tool_use_id: None,
        messages,
    })
}

/// Mark subtasks that started within the same fixed-width time window.
///
/// Buckets every subtask by `started_at` into 500 ms windows; any subtask
/// sharing a bucket with at least one sibling is flagged parallel.
pub fn mark_parallel(subagents: &mut [ResolvedSubagent]) {
    let mut buckets: HashMap<i64, usize> = HashMap::new();
    for agent in subagents.iter() {
        *buckets.entry(bucket_of(agent)).or_insert(0) += 1;
    }
    for agent in subagents.iter_mut() {
        agent.is_parallel = buckets.get(&bucket_of(agent)).copied().unwrap_or(0) >= 2;
    }
}

fn bucket_of(agent: &ResolvedSubagent) -> i64 {
    agent.started_at.timestamp_millis().div_euclid(PARALLEL_BUCKET_MS)
}

/// Attach subtasks to the turns that spawned them.
///
/// A subtask attaches to the first turn whose window contains its start
/// time; subtasks inside a turn stay sorted by start time. Subtasks no turn
/// contains are returned as orphans. After attachment, each subtask is
/// linked to the Task tool-call that most plausibly spawned it: the latest
/// call in the same turn at or before the subtask's start and within a
/// 5-second window.
pub fn attach_to_turns(
    turns: &mut [ConversationTurn],
    subagents: Vec<ResolvedSubagent>,
) -> Vec<ResolvedSubagent> {
    let mut orphans = Vec::new();

    for agent in subagents {
        match turns.iter_mut().find(|t| t.contains(agent.started_at)) {
            Some(turn) => turn.subagents.push(agent),
            None => orphans.push(agent),
        }
    }

    for turn in turns.iter_mut() {
        turn.subagents.sort_by_key(|a| a.started_at);
        link_task_calls(turn);
    }

    orphans
}

/// Associate each attached subtask with the Task call that spawned it.
fn link_task_calls(turn: &mut ConversationTurn) {
    let invocations: Vec<_> = turn
        .responses
        .iter()
        .flat_map(Message::task_invocations)
        .collect();
    if invocations.is_empty() {
        return;
    }

    for agent in &mut turn.subagents {
        let best = invocations
            .iter()
            .filter(|inv| {
                inv.timestamp <= agent.started_at
                    && (agent.started_at - inv.timestamp).num_milliseconds() <= TASK_LINK_WINDOW_MS
            })
            .max_by_key(|inv| inv.timestamp);

        if let Some(inv) = best {
            agent.linked_tool_use_id = Some(inv.tool_use_id.clone());
            if inv.description.is_some() {
                agent.description.clone_from(&inv.description);
            }
            if agent.subagent_type.is_none() {
                agent.subagent_type.clone_from(&inv.subagent_type);
            }
        }
    }
}
