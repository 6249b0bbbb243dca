//! Session reconstruction orchestration.
//!
//! Ties the pipeline together for one session: read the log, normalize,
//! group into turns, resolve and attach subagents, total the accounting.
//! Failures degrade the way the rest of the crate does: a missing subtask
//! file is "no subtask", a bad session surfaces as `None` at the boundary
//! with a logged cause.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::journal::{self, read_entries};
use crate::model::{normalize_entries, Message, TokenUsage};

use super::error::ReconstructError;
use super::subagent::{attach_to_turns, mark_parallel, resolve_subagent, ResolvedSubagent};
use super::turns::{build_turns, is_trigger, ConversationTurn};

/// The reconstructed aggregate for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub project_id: String,
    pub session_id: String,
    pub turns: Vec<ConversationTurn>,
    pub total_usage: TokenUsage,
    pub duration_ms: i64,
    pub message_count: usize,
}

/// Cheap per-session summary for listings. Computed from the normalized
/// stream alone, without turn grouping or subagent resolution.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: usize,
    pub turn_count: usize,
    pub preview: String,
    pub usage: TokenUsage,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Reconstruct one session from disk.
///
/// # Errors
///
/// Returns `NotFound` when the session log does not exist and `Io` when it
/// exists but cannot be read. Subagent files degrade instead: an unreadable
/// subtask is skipped with a warning.
pub async fn reconstruct_session(
    projects_root: &Path,
    project_id: &str,
    session_id: &str,
) -> Result<SessionDetail, ReconstructError> {
    let path = journal::session_file(projects_root, project_id, session_id);
    if !path.is_file() {
        return Err(ReconstructError::NotFound {
            project_id: project_id.to_string(),
            session_id: session_id.to_string(),
        });
    }

    let entries = read_entries(&path).await?;
    let messages = normalize_entries(&entries);
    let mut turns = build_turns(&messages);

    let subagents = resolve_all_subagents(projects_root, project_id, session_id).await;
    let orphans = attach_to_turns(&mut turns, subagents);
    if !orphans.is_empty() {
        tracing::debug!(
            session_id,
            count = orphans.len(),
            "Subagents outside every turn window were not attached"
        );
    }

    let total_usage = turns
        .iter()
        .map(|t| t.usage)
        .fold(TokenUsage::default(), |acc, u| acc.add(&u));

    Ok(SessionDetail {
        project_id: project_id.to_string(),
        session_id: session_id.to_string(),
        total_usage,
        duration_ms: span_ms(&messages),
        message_count: messages.len(),
        turns,
    })
}

/// Boundary wrapper: reconstruct a session, surfacing any failure as `None`
/// with a logged cause so one bad session never prevents serving others.
pub async fn try_reconstruct_session(
    projects_root: &Path,
    project_id: &str,
    session_id: &str,
) -> Option<SessionDetail> {
    match reconstruct_session(projects_root, project_id, session_id).await {
        Ok(detail) => Some(detail),
        Err(e) => {
            tracing::warn!(project_id, session_id, error = %e, "Session reconstruction failed");
            None
        }
    }
}

/// Resolve every subtask of a session. Missing directories and unreadable
/// files yield no subtasks rather than errors.
async fn resolve_all_subagents(
    projects_root: &Path,
    project_id: &str,
    session_id: &str,
) -> Vec<ResolvedSubagent> {
    let dir = journal::subagents_dir(projects_root, project_id, session_id);
    let mut resolved = Vec::new();

    for (agent_id, path) in journal::discover_subagent_files(&dir) {
        let entries = match read_entries(&path).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(agent_id, path = %path.display(), error = %e, "Skipping unreadable subagent file");
                continue;
            }
        };
        let messages = normalize_entries(&entries);
        if let Some(agent) = resolve_subagent(&agent_id, messages) {
            resolved.push(agent);
        }
    }

    mark_parallel(&mut resolved);
    resolved
}

/// Summarize a session log without full reconstruction.
///
/// A missing or unreadable file yields an empty summary.
pub async fn summarize_session(path: &Path, session_id: &str) -> SessionSummary {
    let entries = read_entries(path).await.unwrap_or_default();
    let messages = normalize_entries(&entries);

    let usage = messages
        .iter()
        .filter_map(|m| m.usage)
        .fold(TokenUsage::default(), |acc, u| acc.add(&u));

    let preview = messages
        .iter()
        .find(|m| is_trigger(m))
        .map(|m| truncate_preview(&m.text()))
        .unwrap_or_default();

    SessionSummary {
        session_id: session_id.to_string(),
        message_count: messages.len(),
        turn_count: messages.iter().filter(|m| is_trigger(m)).count(),
        preview,
        usage,
        started_at: messages.iter().map(|m| m.timestamp).min(),
        ended_at: messages.iter().map(|m| m.timestamp).max(),
    }
}

fn span_ms(messages: &[Message]) -> i64 {
    match (
        messages.iter().map(|m| m.timestamp).min(),
        messages.iter().map(|m| m.timestamp).max(),
    ) {
        (Some(first), Some(last)) => (last - first).num_milliseconds(),
        _ => 0,
    }
}

fn truncate_preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 80;
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        trimmed.to_string()
    } else {
        let mut preview: String = trimmed.chars().take(PREVIEW_CHARS).collect();
        preview.push('…');
        preview
    }
}
