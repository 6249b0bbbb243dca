//! Canonical message model.
//!
//! Raw journal entries are normalized into `Message` records here; everything
//! downstream (turn grouping, subagent resolution, accounting, triggers)
//! consumes this model instead of the wire format.

mod message;
mod normalizer;
mod usage;

pub use message::{ContentBlock, Message, MessageContent, MessageKind, TaskInvocation};
pub use normalizer::{normalize_entries, normalize_entry, TASK_TOOL};
pub use usage::TokenUsage;
