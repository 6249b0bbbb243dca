//! Reconstruction error types.

/// Errors that can occur while reconstructing a session.
#[derive(thiserror::Error, Debug)]
pub enum ReconstructError {
    /// The requested session has no log file on disk.
    #[error("Session not found: {project_id}/{session_id}")]
    NotFound {
        project_id: String,
        session_id: String,
    },

    /// I/O error reading the session log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
