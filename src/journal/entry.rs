//! Typed raw entries for Claude Code JSONL conversation files.
//!
//! One `RawEntry` per log line, discriminated by the `type` field. Fields are
//! deliberately loose (`Option` + defaults): the log format is append-only and
//! loosely typed, and normalization decides what is usable.

use serde::Deserialize;

/// A single line of a Claude Code JSONL log file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RawEntry {
    /// User message or tool result.
    User(UserEntry),
    /// Assistant response.
    Assistant(AssistantEntry),
    /// System message.
    System(SystemEntry),
    /// Session summary.
    Summary(SummaryEntry),
    /// File backup snapshot.
    FileHistorySnapshot(SnapshotEntry),
    /// Queue operation (headless mode).
    QueueOperation(QueueOperationEntry),
    /// Unknown entry type (forward compatibility).
    #[serde(other)]
    Unknown,
}

impl RawEntry {
    /// The entry's identifier, if it carries one.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        match self {
            RawEntry::User(e) => e.uuid.as_deref(),
            RawEntry::Assistant(e) => e.uuid.as_deref(),
            RawEntry::System(e) => e.uuid.as_deref(),
            RawEntry::Summary(e) => e.leaf_uuid.as_deref(),
            RawEntry::FileHistorySnapshot(e) => e.message_id.as_deref(),
            RawEntry::QueueOperation(_) | RawEntry::Unknown => None,
        }
    }

    /// The entry's timestamp string, if it carries one.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            RawEntry::User(e) => e.timestamp.as_deref(),
            RawEntry::Assistant(e) => e.timestamp.as_deref(),
            RawEntry::System(e) => e.timestamp.as_deref(),
            RawEntry::QueueOperation(e) => e.timestamp.as_deref(),
            _ => None,
        }
    }
}

/// User message entry. Covers both real user input and tool-result wrappers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub is_meta: Option<bool>,
    #[serde(default)]
    pub is_sidechain: Option<bool>,
    /// Tool-use id this message answers, when it wraps a tool result.
    #[serde(default)]
    pub source_tool_use_id: Option<String>,
    /// Enriched result payload attached by the agent runtime.
    #[serde(default)]
    pub tool_use_result: Option<serde_json::Value>,
}

/// Assistant message entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantEntry {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub is_sidechain: Option<bool>,
}

/// System message entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemEntry {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_meta: Option<bool>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
}

/// Session summary entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub summary: String,
    #[serde(default)]
    pub leaf_uuid: Option<String>,
}

/// File history snapshot entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub snapshot: Option<serde_json::Value>,
}

/// Queue operation entry (headless mode).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOperationEntry {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The nested API message carried by conversational entries.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: RawContent,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<RawUsage>,
}

/// Message content - plain text or an ordered block sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    /// Plain text content.
    Text(String),
    /// Structured content blocks.
    Blocks(Vec<RawBlock>),
}

/// A content block within a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawBlock {
    /// Text content.
    Text { text: String },
    /// Thinking block.
    Thinking { thinking: String },
    /// Tool use request.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Tool result.
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<serde_json::Value>,
        #[serde(default)]
        is_error: Option<bool>,
    },
    /// Unknown block type.
    #[serde(other)]
    Unknown,
}

/// Token counters reported by the API for one message.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_entry() {
        let json = r#"{"type":"user","uuid":"abc-123","parentUuid":null,"sessionId":"sess-1","timestamp":"2026-01-29T10:00:00Z","message":{"role":"user","content":"Hello world"},"userType":"external","cwd":"/tmp"}"#;

        let entry: RawEntry = serde_json::from_str(json).unwrap();

        match entry {
            RawEntry::User(u) => {
                assert_eq!(u.uuid.as_deref(), Some("abc-123"));
                assert_eq!(u.session_id.as_deref(), Some("sess-1"));
                assert!(u.parent_uuid.is_none());
            }
            _ => panic!("Expected User entry"),
        }
    }

    #[test]
    fn test_parse_assistant_entry_with_usage() {
        let json = r#"{"type":"assistant","uuid":"def-456","parentUuid":"abc-123","timestamp":"2026-01-29T10:00:01Z","message":{"role":"assistant","model":"claude-sonnet-4-20250514","content":[{"type":"text","text":"Hi there!"}],"usage":{"input_tokens":10,"output_tokens":25,"cache_read_input_tokens":1000}},"cwd":"/tmp"}"#;

        let entry: RawEntry = serde_json::from_str(json).unwrap();

        match entry {
            RawEntry::Assistant(a) => {
                assert_eq!(a.uuid.as_deref(), Some("def-456"));
                let message = a.message.unwrap();
                assert_eq!(message.model.as_deref(), Some("claude-sonnet-4-20250514"));
                let usage = message.usage.unwrap();
                assert_eq!(usage.input_tokens, 10);
                assert_eq!(usage.output_tokens, 25);
                assert_eq!(usage.cache_read_input_tokens, 1000);
                assert_eq!(usage.cache_creation_input_tokens, 0);
            }
            _ => panic!("Expected Assistant entry"),
        }
    }

    #[test]
    fn test_parse_content_as_string() {
        let json = r#"{"role":"user","content":"plain text"}"#;
        let msg: RawMessage = serde_json::from_str(json).unwrap();

        match msg.content {
            RawContent::Text(s) => assert_eq!(s, "plain text"),
            RawContent::Blocks(_) => panic!("Expected Text content"),
        }
    }

    #[test]
    fn test_parse_content_as_blocks() {
        let json = r#"{"role":"assistant","content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"hello"}]}"#;
        let msg: RawMessage = serde_json::from_str(json).unwrap();

        match msg.content {
            RawContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                assert!(matches!(&blocks[0], RawBlock::Thinking { thinking } if thinking == "hmm"));
                assert!(matches!(&blocks[1], RawBlock::Text { text } if text == "hello"));
            }
            RawContent::Text(_) => panic!("Expected Blocks content"),
        }
    }

    #[test]
    fn test_parse_tool_result_block_with_error_flag() {
        let json = r#"{"type":"tool_result","tool_use_id":"toolu_1","content":"Exit code 1","is_error":true}"#;
        let block: RawBlock = serde_json::from_str(json).unwrap();

        match block {
            RawBlock::ToolResult {
                tool_use_id,
                is_error,
                ..
            } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert_eq!(is_error, Some(true));
            }
            _ => panic!("Expected ToolResult block"),
        }
    }

    #[test]
    fn test_parse_unknown_entry_type() {
        let json = r#"{"type":"future-type","data":"something"}"#;
        let entry: RawEntry = serde_json::from_str(json).unwrap();
        assert!(matches!(entry, RawEntry::Unknown));
    }

    #[test]
    fn test_parse_unknown_block_type() {
        let json = r#"{"type":"future_block","data":"something"}"#;
        let block: RawBlock = serde_json::from_str(json).unwrap();
        assert!(matches!(block, RawBlock::Unknown));
    }

    #[test]
    fn test_uuid_accessor_across_kinds() {
        let user: RawEntry = serde_json::from_str(
            r#"{"type":"user","uuid":"u1","timestamp":"2026-01-29T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(user.uuid(), Some("u1"));

        let summary: RawEntry =
            serde_json::from_str(r#"{"type":"summary","summary":"Fixed the bug","leafUuid":"u9"}"#)
                .unwrap();
        assert_eq!(summary.uuid(), Some("u9"));

        let unknown: RawEntry = serde_json::from_str(r#"{"type":"nope"}"#).unwrap();
        assert_eq!(unknown.uuid(), None);
    }

    #[test]
    fn test_entry_without_uuid_still_parses() {
        let json = r#"{"type":"user","timestamp":"2026-01-29T10:00:00Z","message":{"role":"user","content":"no id"}}"#;
        let entry: RawEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.uuid(), None);
    }
}
