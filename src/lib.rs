//! Claude Lens - reconstructs Claude Code session logs into navigable conversations.

pub mod cache;
pub mod config;
pub mod journal;
pub mod model;
pub mod reconstruct;
pub mod triggers;
pub mod watcher;
