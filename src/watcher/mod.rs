//! Live observation of the session log tree.
//!
//! Watches the projects root for changes, debounces bursts of writes per
//! path, invalidates the affected cache entries, and incrementally rescans
//! appended lines for the trigger matcher. Reconstruction itself stays
//! lazy: the next read request repopulates the cache.

mod debounce;
mod error;
mod events;
mod service;
mod tailer;

pub use debounce::PathDebouncer;
pub use error::WatcherError;
pub use events::{classify_path, FileChangeKind, SessionFileEvent};
pub use service::{LogWatcher, WatchUpdate, DEFAULT_DEBOUNCE};
pub use tailer::LogTailer;
