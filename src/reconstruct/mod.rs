//! Session reconstruction.
//!
//! Groups the normalized message stream into conversation turns, resolves
//! subagent logs, detects parallelism, and computes token accounting.

mod error;
mod session;
mod steps;
mod subagent;
mod turns;

pub use error::ReconstructError;
pub use session::{
    reconstruct_session, summarize_session, try_reconstruct_session, SessionDetail, SessionSummary,
};
pub use steps::{build_steps, AccountingStrategy, SemanticStep, StepKind, CONTEXT_BASELINE};
pub use subagent::{
    attach_to_turns, mark_parallel, resolve_subagent, ResolvedSubagent, PARALLEL_BUCKET_MS,
    TASK_LINK_WINDOW_MS,
};
pub use turns::{build_turns, is_trigger, ConversationTurn};
