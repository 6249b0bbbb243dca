//! Journal module for Claude Code JSONL log files.
//!
//! Provides typed raw entries and line-oriented readers for session and
//! subagent log files.

mod discovery;
mod entry;
mod reader;

pub use discovery::{
    default_projects_root, discover_subagent_files, extract_agent_id, find_latest_session,
    list_project_dirs, list_session_files, project_id_for_path, session_file, subagents_dir,
};
pub use entry::{
    AssistantEntry, QueueOperationEntry, RawBlock, RawContent, RawEntry, RawMessage, RawUsage,
    SnapshotEntry, SummaryEntry, SystemEntry, UserEntry,
};
pub use reader::{parse_content, read_entries, stream_entries};
