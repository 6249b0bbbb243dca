//! Trigger scanning over normalized messages.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::journal::stream_entries;
use crate::model::{normalize_entry, Message};

use super::rules::{TriggerRule, TriggerRuleConfig};
use super::TriggerError;

/// Maximum characters kept from the matched text.
pub const EXCERPT_CHARS: usize = 500;

/// A detected error, ready for notification and deep-linking.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedError {
    pub id: Uuid,
    pub project_id: String,
    pub session_id: String,
    /// Name of the rule that fired.
    pub rule: String,
    pub category: Option<String>,
    /// Tool that produced the matched content, when known.
    pub source: Option<String>,
    /// Matched text, truncated to [`EXCERPT_CHARS`].
    pub excerpt: String,
    /// 1-based line in the source log file.
    pub line: usize,
    /// Tool-use id for deep-linking into the conversation.
    pub tool_use_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Scans normalized messages against a compiled, ordered rule set.
#[derive(Debug, Clone)]
pub struct TriggerScanner {
    rules: Vec<TriggerRule>,
}

impl TriggerScanner {
    /// Compile a rule set into a scanner.
    ///
    /// # Errors
    ///
    /// Returns an error if any rule pattern fails to compile.
    pub fn compile(configs: &[TriggerRuleConfig]) -> Result<Self, TriggerError> {
        let rules = configs
            .iter()
            .map(TriggerRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Number of compiled rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Scan a message sequence with a fresh tool-name correlation state.
    #[must_use]
    pub fn scan(
        &self,
        project_id: &str,
        session_id: &str,
        messages: &[Message],
    ) -> Vec<DetectedError> {
        let mut tool_names = HashMap::new();
        self.scan_with_state(project_id, session_id, messages, &mut tool_names)
    }

    /// Scan a message sequence, correlating tool results to tool names
    /// through `tool_names`.
    ///
    /// The map is updated as tool calls are seen, so incremental callers
    /// that keep it across invocations resolve names for results whose
    /// calls were scanned earlier.
    #[must_use]
    pub fn scan_with_state(
        &self,
        project_id: &str,
        session_id: &str,
        messages: &[Message],
        tool_names: &mut HashMap<String, String>,
    ) -> Vec<DetectedError> {
        let mut detected = Vec::new();

        for message in messages {
            for (id, name, _) in message.tool_calls() {
                tool_names.insert(id.to_string(), name.to_string());
            }

            for (tool_use_id, content, is_error) in message.tool_results() {
                let text = content.map(render_result_text).unwrap_or_default();
                let resolved = tool_names.get(tool_use_id).map(String::as_str);

                // Ordered rule set: the first matching rule claims the result.
                if let Some(rule) = self
                    .rules
                    .iter()
                    .find(|rule| rule.matches_tool_result(resolved, &text, is_error))
                {
                    detected.push(make_detected(
                        project_id,
                        session_id,
                        rule,
                        resolved.map(String::from),
                        &text,
                        message,
                        Some(tool_use_id.to_string()),
                    ));
                }
            }

            for (id, name, input) in message.tool_calls() {
                if let Some((rule, text)) = self
                    .rules
                    .iter()
                    .find_map(|rule| rule.matches_tool_call(input).map(|text| (rule, text)))
                {
                    detected.push(make_detected(
                        project_id,
                        session_id,
                        rule,
                        Some(name.to_string()),
                        &text,
                        message,
                        Some(id.to_string()),
                    ));
                }
            }
        }

        detected
    }

    /// Scan a log file incrementally.
    ///
    /// Skips the first `from_line` lines, normalizes and scans the appended
    /// suffix, and returns the detections plus the file's new total line
    /// count (the `from_line` to pass next time). Line numbers in the
    /// detections are absolute, so scanning `[0, n)` then `[n, m)` reports
    /// the same errors as one scan of `[0, m)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn scan_file(
        &self,
        path: &Path,
        project_id: &str,
        session_id: &str,
        from_line: usize,
        tool_names: &mut HashMap<String, String>,
    ) -> std::io::Result<(Vec<DetectedError>, usize)> {
        let mut messages = Vec::new();
        let total_lines = stream_entries(path, from_line, |line_no, entry| {
            if let Some(message) = normalize_entry(line_no, &entry) {
                messages.push(message);
            }
        })
        .await?;

        let detected = self.scan_with_state(project_id, session_id, &messages, tool_names);
        Ok((detected, total_lines))
    }

}

#[allow(clippy::too_many_arguments)]
fn make_detected(
    project_id: &str,
    session_id: &str,
    rule: &TriggerRule,
    source: Option<String>,
    text: &str,
    message: &Message,
    tool_use_id: Option<String>,
) -> DetectedError {
    DetectedError {
        id: Uuid::new_v4(),
        project_id: project_id.to_string(),
        session_id: session_id.to_string(),
        rule: rule.name().to_string(),
        category: rule.category().map(String::from),
        source,
        excerpt: truncate_chars(text, EXCERPT_CHARS),
        line: message.line,
        tool_use_id,
        timestamp: message.timestamp,
    }
}

/// Render a tool-result payload as matchable text: strings verbatim, block
/// lists by their text fields, anything else as compact JSON.
fn render_result_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => {
            let texts: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
                .collect();
            if texts.is_empty() {
                value.to_string()
            } else {
                texts.join("\n")
            }
        }
        other => other.to_string(),
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}
