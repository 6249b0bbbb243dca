//! Classification of filesystem events against the session tree layout.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeKind {
    Add,
    Change,
    Unlink,
}

/// A debounced, classified change in the session tree.
#[derive(Debug, Clone, Serialize)]
pub struct SessionFileEvent {
    pub kind: FileChangeKind,
    pub path: PathBuf,
    pub project_id: Option<String>,
    /// Absent for project-directory-level events.
    pub session_id: Option<String>,
    pub is_subagent: bool,
}

/// Classify a path under the projects root.
///
/// Returns `(project_id, session_id, is_subagent)`:
/// - `<root>/<project>` → `(project, None, false)`
/// - `<root>/<project>/<session>.jsonl` → `(project, Some(session), false)`
/// - `<root>/<project>/<session>` and below → subagent territory,
///   `(project, Some(session), true)`
///
/// Paths outside the layout (wrong depth, non-jsonl files at file level)
/// yield `None`.
#[must_use]
pub fn classify_path(
    projects_root: &Path,
    path: &Path,
) -> Option<(String, Option<String>, bool)> {
    let relative = path.strip_prefix(projects_root).ok()?;
    let components: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    match components.as_slice() {
        [project] => Some(((*project).to_string(), None, false)),
        [project, file] => match file.strip_suffix(".jsonl") {
            Some(session) => Some(((*project).to_string(), Some(session.to_string()), false)),
            // A bare directory next to the session files holds that
            // session's subagents.
            None if !file.contains('.') => {
                Some(((*project).to_string(), Some((*file).to_string()), true))
            }
            None => None,
        },
        [project, session, "subagents"] => {
            Some(((*project).to_string(), Some((*session).to_string()), true))
        }
        [project, session, "subagents", file] if file.ends_with(".jsonl") => {
            Some(((*project).to_string(), Some((*session).to_string()), true))
        }
        _ => None,
    }
}

impl SessionFileEvent {
    /// Build an event from a debounced path change, classifying it against
    /// the projects root. Unclassifiable paths yield `None`.
    #[must_use]
    pub fn classify(projects_root: &Path, path: PathBuf, kind: FileChangeKind) -> Option<Self> {
        let (project_id, session_id, is_subagent) = classify_path(projects_root, &path)?;
        Some(Self {
            kind,
            path,
            project_id: Some(project_id),
            session_id,
            is_subagent,
        })
    }
}
