//! Error-trigger matching.
//!
//! A configurable, ordered rule set is matched against the normalized
//! message stream to flag errors for notification. Scanning is incremental:
//! given a previously processed line count, only the appended suffix of a
//! log file is re-normalized and matched.

mod rules;
mod scanner;

pub use rules::{default_rules, TriggerError, TriggerRule, TriggerRuleConfig};
pub use scanner::{DetectedError, TriggerScanner, EXCERPT_CHARS};
