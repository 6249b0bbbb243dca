//! Log file discovery.
//!
//! Locates session and subagent log files under the agent runtime's
//! projects tree (`~/.claude/projects` by default).

use std::path::{Path, PathBuf};

/// Convert a project path to the directory-name form used on disk.
///
/// Project directories are named after the project path with `/` replaced
/// by `-`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use claude_lens::journal::project_id_for_path;
///
/// let id = project_id_for_path(Path::new("/home/user/project"));
/// assert_eq!(id, "-home-user-project");
/// ```
#[must_use]
pub fn project_id_for_path(project_path: &Path) -> String {
    project_path.to_string_lossy().replace('/', "-")
}

/// The default projects root: `~/.claude/projects`.
#[must_use]
pub fn default_projects_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("projects"))
}

/// Path of a session's log file.
#[must_use]
pub fn session_file(projects_root: &Path, project_id: &str, session_id: &str) -> PathBuf {
    projects_root
        .join(project_id)
        .join(format!("{session_id}.jsonl"))
}

/// Path of a session's subagents directory.
#[must_use]
pub fn subagents_dir(projects_root: &Path, project_id: &str, session_id: &str) -> PathBuf {
    projects_root
        .join(project_id)
        .join(session_id)
        .join("subagents")
}

/// List project directories under the projects root.
#[must_use]
pub fn list_project_dirs(projects_root: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(projects_root) else {
        return Vec::new();
    };
    let mut projects: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            Some((name, entry.path()))
        })
        .collect();
    projects.sort();
    projects
}

/// List session log files in a project directory as `(session_id, path)`.
#[must_use]
pub fn list_session_files(project_dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(project_dir) else {
        return Vec::new();
    };
    let mut sessions: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.to_string();
            Some((stem, path))
        })
        .collect();
    sessions.sort();
    sessions
}

/// Find the most recently modified session file in a project directory.
#[must_use]
pub fn find_latest_session(project_dir: &Path) -> Option<PathBuf> {
    list_session_files(project_dir)
        .into_iter()
        .filter_map(|(_, path)| {
            let modified = path.metadata().ok()?.modified().ok()?;
            Some((path, modified))
        })
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path)
}

/// Extract the agent id from a subagent filename.
///
/// The file stem is the agent id; the legacy `agent-<id>.jsonl` form is also
/// accepted, stripping the prefix.
#[must_use]
pub fn extract_agent_id(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(".jsonl")?;
    let id = stem.strip_prefix("agent-").unwrap_or(stem);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Discover subagent log files in a subagents directory.
///
/// Returns `(agent_id, path)` pairs. A missing or unreadable directory is
/// treated as "no subagents", never an error.
#[must_use]
pub fn discover_subagent_files(subagents_dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(subagents_dir) else {
        return Vec::new();
    };
    let mut agents: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|path| {
            let filename = path.file_name()?.to_str()?;
            let agent_id = extract_agent_id(filename)?;
            Some((agent_id, path))
        })
        .collect();
    agents.sort();
    agents
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_id_for_path() {
        assert_eq!(
            project_id_for_path(Path::new("/home/user/project")),
            "-home-user-project"
        );
        assert_eq!(
            project_id_for_path(Path::new("/home/user/dev/rust/my-project")),
            "-home-user-dev-rust-my-project"
        );
        assert_eq!(project_id_for_path(Path::new("/")), "-");
    }

    #[test]
    fn test_session_file_layout() {
        let path = session_file(Path::new("/logs"), "-home-me-proj", "sess-1");
        assert_eq!(path, PathBuf::from("/logs/-home-me-proj/sess-1.jsonl"));
    }

    #[test]
    fn test_subagents_dir_layout() {
        let path = subagents_dir(Path::new("/logs"), "-home-me-proj", "sess-1");
        assert_eq!(path, PathBuf::from("/logs/-home-me-proj/sess-1/subagents"));
    }

    #[test]
    fn test_extract_agent_id_plain_stem() {
        assert_eq!(extract_agent_id("abc1234.jsonl"), Some("abc1234".to_string()));
        assert_eq!(
            extract_agent_id("xyz-789.jsonl"),
            Some("xyz-789".to_string())
        );
    }

    #[test]
    fn test_extract_agent_id_legacy_prefix() {
        assert_eq!(
            extract_agent_id("agent-abc1234.jsonl"),
            Some("abc1234".to_string())
        );
        assert_eq!(extract_agent_id("agent-.jsonl"), None);
    }

    #[test]
    fn test_extract_agent_id_invalid() {
        assert_eq!(extract_agent_id("notes.txt"), None);
        assert_eq!(extract_agent_id(""), None);
        assert_eq!(extract_agent_id(".jsonl"), None);
    }

    #[test]
    fn test_list_session_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("sess-a.jsonl"), "{}").unwrap();
        std::fs::write(temp.path().join("sess-b.jsonl"), "{}").unwrap();
        std::fs::write(temp.path().join("readme.md"), "hi").unwrap();
        std::fs::create_dir(temp.path().join("sess-a")).unwrap();

        let sessions = list_session_files(temp.path());

        let ids: Vec<&str> = sessions.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["sess-a", "sess-b"]);
    }

    #[test]
    fn test_list_session_files_missing_dir() {
        assert!(list_session_files(Path::new("/nonexistent/lens-xyz")).is_empty());
    }

    #[test]
    fn test_discover_subagent_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("abc123.jsonl"), "{}").unwrap();
        std::fs::write(temp.path().join("agent-def456.jsonl"), "{}").unwrap();
        std::fs::write(temp.path().join("ignore.txt"), "{}").unwrap();

        let agents = discover_subagent_files(temp.path());

        let ids: Vec<&str> = agents.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"abc123"));
        assert!(ids.contains(&"def456"));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_discover_subagent_files_missing_dir() {
        assert!(discover_subagent_files(Path::new("/nonexistent/lens-xyz")).is_empty());
    }

    #[test]
    fn test_find_latest_session() {
        let temp = TempDir::new().unwrap();
        let old = temp.path().join("old.jsonl");
        std::fs::write(&old, "{}").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let new = temp.path().join("new.jsonl");
        std::fs::write(&new, "{}").unwrap();

        assert_eq!(find_latest_session(temp.path()), Some(new));
    }
}
